//! Buffer-based (BB) policy: maps current buffer occupancy to a target
//! bitrate through a reservoir/cushion piecewise-linear curve.

use tracing::debug;

use crate::catalogue::Catalogue;
use crate::pipeline::{PipelineState, QualityPolicy};
use crate::telemetry::{Metrics, SegmentState, Value};

const SECOND_MS: f64 = 1000.0;
const RESERVOIR_MS: f64 = 5.0 * SECOND_MS;
const CUSHION_MS: f64 = 10.0 * SECOND_MS;

#[derive(Debug)]
pub struct BufferBasedPolicy {
    last_player_time: Value,
    last_buffer_level: Value,
    /// Reused when the catalogue doesn't have a next segment to measure
    /// against (end of the ladder); seeded lazily from the nominal spacing
    /// between the first two segments the first time it's needed.
    last_segment_time_length_ms: Option<i64>,
}

impl Default for BufferBasedPolicy {
    fn default() -> Self {
        Self {
            last_player_time: Value::zero(),
            last_buffer_level: Value::zero(),
            last_segment_time_length_ms: None,
        }
    }
}

impl BufferBasedPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    fn nominal_segment_length_ms(&self, catalogue: &Catalogue) -> i64 {
        match (catalogue.info(0, 0), catalogue.info(0, 1)) {
            (Some(a), Some(b)) => ((b.start_time - a.start_time) * SECOND_MS) as i64,
            _ => 0,
        }
    }

    fn segment_length_ms(&mut self, index: i32, catalogue: &Catalogue) -> i64 {
        let idx = index as usize;
        if let (Some(current), Some(next)) = (catalogue.info(0, idx), catalogue.info(0, idx + 1)) {
            let length = ((next.start_time - current.start_time) * SECOND_MS) as i64;
            self.last_segment_time_length_ms = Some(length);
            return length;
        }
        *self
            .last_segment_time_length_ms
            .get_or_insert_with(|| self.nominal_segment_length_ms(catalogue))
    }
}

impl QualityPolicy for BufferBasedPolicy {
    fn register_metrics(&mut self, metrics: &Metrics) {
        for sample in &metrics.player_time {
            if sample.timestamp > self.last_player_time.timestamp {
                self.last_player_time = *sample;
            }
        }
        for sample in &metrics.buffer_level {
            if sample.timestamp > self.last_buffer_level.timestamp {
                self.last_buffer_level = *sample;
            }
        }
    }

    fn decide_quality(&mut self, index: i32, state: &PipelineState, catalogue: &Catalogue) -> i32 {
        if index == 1 {
            return 0;
        }
        let n = catalogue.quality_count();
        if n == 0 {
            return 0;
        }

        let mut buffer_level = self.last_buffer_level.value as f64;

        if let Some(prev) = state.last_segment.get(&(index - 1)) {
            if prev.state == SegmentState::Progress {
                let proportion = prev.progress();
                if proportion > 0.0 {
                    let start = if index > 2 {
                        state.last_segment.get(&(index - 2)).map_or(0, |s| s.timestamp)
                    } else {
                        0
                    };
                    let now = prev.timestamp;
                    let estimated_download_remaining_ms =
                        (now - start) as f64 * (1.0 - proportion) / proportion;
                    let segment_len_ms = self.segment_length_ms(index, catalogue) as f64;
                    let bonus = segment_len_ms - estimated_download_remaining_ms;
                    buffer_level += bonus;
                }
            }
        }
        debug!(index, buffer_level, "bb effective buffer level");

        let bitrate_array = catalogue.bitrate_array();
        let lowest = bitrate_array[0] as f64;
        let highest = bitrate_array[n - 1] as f64;

        let target_rate = if buffer_level <= RESERVOIR_MS {
            lowest
        } else if buffer_level >= RESERVOIR_MS + CUSHION_MS {
            highest
        } else {
            lowest + (highest - lowest) * (buffer_level - RESERVOIR_MS) / CUSHION_MS
        };

        bitrate_array
            .iter()
            .rposition(|&rate| rate as f64 <= target_rate)
            .unwrap_or(0) as i32
    }
}
