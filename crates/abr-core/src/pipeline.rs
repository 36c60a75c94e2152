//! Per-connection decision pipeline: the `SegmentProgress` state machine.
//!
//! Tracks per-index segment state, gates emission of the next decision, and
//! memoises decisions so that repeated `decide()` calls without new
//! telemetry are idempotent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalogue::Catalogue;
use crate::telemetry::{Decision, Metrics, Segment, SegmentState};

/// State private to the decision pipeline, shared with a [`QualityPolicy`]
/// at `decide_quality` time so policies can read prior segment history
/// without owning it themselves.
#[derive(Debug, Default)]
pub struct PipelineState {
    pub last_segment: HashMap<i32, Segment>,
    pub decisions: HashMap<i32, Decision>,
    pub aborted: HashSet<i32>,
    pub decision_index: i32,
    pub last_timestamp: i32,
}

impl PipelineState {
    fn new() -> Self {
        Self { decision_index: 1, ..Default::default() }
    }

    /// Applies the base merge rules for one telemetry segment entry.
    /// `Loading` is ignored here; Minerva's own state tracks it separately.
    fn merge_segment(&mut self, segment: &Segment) {
        self.last_timestamp = self.last_timestamp.max(segment.timestamp);

        match segment.state {
            SegmentState::Loading => {}
            SegmentState::Downloaded => {
                let should_overwrite = match self.last_segment.get(&segment.index) {
                    None => true,
                    Some(existing) => existing.state != SegmentState::Downloaded,
                };
                if should_overwrite {
                    debug!(index = segment.index, "segment downloaded");
                    self.last_segment.insert(segment.index, *segment);
                }
            }
            SegmentState::Progress => {
                let should_overwrite = match self.last_segment.get(&segment.index) {
                    None => true,
                    Some(existing) => {
                        existing.state == SegmentState::Progress
                            && existing.timestamp < segment.timestamp
                    }
                };
                if should_overwrite {
                    debug!(
                        index = segment.index,
                        loaded = segment.loaded,
                        total = segment.total,
                        "segment progress"
                    );
                    self.last_segment.insert(segment.index, *segment);
                }
            }
        }
    }

    fn register_metrics(&mut self, metrics: &Metrics) {
        for segment in &metrics.segments {
            self.merge_segment(segment);
        }
    }

    fn register_abort(&mut self, index: i32) {
        self.aborted.insert(index);
    }

    /// `should_send(i)`: is the gate open to emit a decision for index `i`?
    fn should_send(&self, index: i32) -> bool {
        if index == 1 {
            return true;
        }
        let prev = match self.last_segment.get(&(index - 1)) {
            Some(prev) => prev,
            None => return false,
        };
        if prev.state != SegmentState::Progress {
            return true;
        }
        if prev.progress() >= 0.80 {
            return true;
        }
        self.aborted.contains(&(index - 1))
    }
}

/// A pluggable quality-selection algorithm consulted by [`SegmentProgress`].
///
/// Implementors receive the shared [`PipelineState`] and [`Catalogue`] at
/// decision time rather than owning a copy, so policy-specific state (e.g.
/// buffer-based's tracked `player_time`/`buffer_level`) only needs to hold
/// what the base pipeline doesn't already track.
pub trait QualityPolicy: Send {
    /// Observe a telemetry batch in addition to the base pipeline's merge.
    /// Most policies don't need this; the default is a no-op.
    fn register_metrics(&mut self, _metrics: &Metrics) {}

    /// Choose a quality in `[0, K)` for `index`.
    fn decide_quality(&mut self, index: i32, state: &PipelineState, catalogue: &Catalogue) -> i32;
}

/// Host-facing contract shared by every session variant: the base
/// `SegmentProgress` pipeline composed with a [`QualityPolicy`], and
/// Minerva's own weight-update variant (see [`crate::policy::minerva`]).
pub trait Controller: Send {
    fn register_metrics(&mut self, metrics: &Metrics);
    fn register_abort(&mut self, index: i32);
    fn decide(&mut self) -> Decision;
}

/// The base decision pipeline, generic over a [`QualityPolicy`].
pub struct SegmentProgress<P: QualityPolicy> {
    state: PipelineState,
    catalogue: Arc<Catalogue>,
    policy: P,
}

impl<P: QualityPolicy> SegmentProgress<P> {
    pub fn new(catalogue: Arc<Catalogue>, policy: P) -> Self {
        Self { state: PipelineState::new(), catalogue, policy }
    }
}

impl<P: QualityPolicy> Controller for SegmentProgress<P> {
    fn register_metrics(&mut self, metrics: &Metrics) {
        self.state.register_metrics(metrics);
        self.policy.register_metrics(metrics);
    }

    fn register_abort(&mut self, index: i32) {
        self.state.register_abort(index);
    }

    fn decide(&mut self) -> Decision {
        let k = self.state.decision_index;
        if !self.state.decisions.contains_key(&k) && self.state.should_send(k) {
            let quality = self.policy.decide_quality(k, &self.state, &self.catalogue);
            let decision = Decision { index: k, quality, timestamp: self.state.last_timestamp };
            self.state.decisions.insert(k, decision);
            self.state.decision_index = k + 1;
            info!(index = k, quality, "new decision");
            decision
        } else {
            match self.state.decisions.get(&(k - 1)) {
                Some(prior) => *prior,
                None => Decision::noop(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedQuality(i32);
    impl QualityPolicy for FixedQuality {
        fn decide_quality(&mut self, _index: i32, _state: &PipelineState, _catalogue: &Catalogue) -> i32 {
            self.0
        }
    }

    fn tiny_catalogue() -> Arc<Catalogue> {
        use crate::catalogue::{CatalogueConfig, VideoConfigEntry, VideoInfo};
        let cfg = CatalogueConfig {
            domain: String::new(),
            segments: 5,
            video_configs: vec![VideoConfigEntry {
                resource: "/video0".into(),
                path: String::new(),
                quality: 500,
                video_info: (0..5)
                    .map(|i| VideoInfo { start_time: i as f64 * 4.0, vmaf: 50.0, size: 100_000 })
                    .collect(),
            }],
        };
        Arc::new(Catalogue::from_config(&cfg).unwrap())
    }

    fn segment(index: i32, state: SegmentState, loaded: u64, total: u64, timestamp: i32) -> Segment {
        Segment { index, timestamp, loaded, total, quality: 0, state }
    }

    #[test]
    fn test_s1_cold_start_returns_decision_for_index_one() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        let decision = pipeline.decide();
        assert_eq!(decision, Decision { index: 1, quality: 0, timestamp: 0 });
    }

    #[test]
    fn test_s2_progress_gate_closed_below_eighty_percent() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        let first = pipeline.decide();
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 50, 100, 1000)],
            ..Default::default()
        });
        let second = pipeline.decide();
        assert_eq!(second, first);
    }

    #[test]
    fn test_s3_eighty_percent_gate_opens_next_index() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        pipeline.decide();
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 50, 100, 1000)],
            ..Default::default()
        });
        pipeline.decide();
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 80, 100, 1200)],
            ..Default::default()
        });
        let decision = pipeline.decide();
        assert_eq!(decision, Decision { index: 2, quality: 0, timestamp: 1200 });
    }

    #[test]
    fn test_s4_abort_opens_gate_regardless_of_progress() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        pipeline.decide();
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 10, 100, 500)],
            ..Default::default()
        });
        pipeline.register_abort(1);
        let decision = pipeline.decide();
        assert_eq!(decision.index, 2);
    }

    #[test]
    fn test_s6_downloaded_is_terminal_over_progress() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(5, SegmentState::Downloaded, 100, 100, 100)],
            ..Default::default()
        });
        pipeline.register_metrics(&Metrics {
            segments: vec![segment(5, SegmentState::Progress, 10, 100, 200)],
            ..Default::default()
        });
        assert_eq!(pipeline.state.last_segment[&5].state, SegmentState::Downloaded);
    }

    #[test]
    fn test_idempotence_without_new_telemetry() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        let first = pipeline.decide();
        let second = pipeline.decide();
        assert_eq!(first, second);
    }

    #[test]
    fn test_decision_monotonicity_and_index_keying() {
        let mut pipeline = SegmentProgress::new(tiny_catalogue(), FixedQuality(0));
        let mut last_index = 0;
        for i in 1..5 {
            pipeline.register_metrics(&Metrics {
                segments: vec![segment(i, SegmentState::Downloaded, 100, 100, i * 100)],
                ..Default::default()
            });
            let decision = pipeline.decide();
            assert!(decision.index >= last_index);
            last_index = decision.index;
        }
        for (index, decision) in &pipeline.state.decisions {
            assert_eq!(decision.index, *index);
        }
    }

    #[test]
    fn test_merge_commutativity_for_downloaded_permutation() {
        let segs = vec![
            segment(1, SegmentState::Downloaded, 100, 100, 10),
            segment(2, SegmentState::Downloaded, 100, 100, 20),
            segment(3, SegmentState::Downloaded, 100, 100, 30),
        ];
        let mut forward = PipelineState::new();
        forward.register_metrics(&Metrics { segments: segs.clone(), ..Default::default() });

        let mut reversed_segs = segs.clone();
        reversed_segs.reverse();
        let mut backward = PipelineState::new();
        backward.register_metrics(&Metrics { segments: reversed_segs, ..Default::default() });

        assert_eq!(forward.last_segment, backward.last_segment);
    }

    #[test]
    fn test_gate_completeness() {
        let mut state = PipelineState::new();
        assert!(!state.should_send(2));

        state.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Downloaded, 100, 100, 1)],
            ..Default::default()
        });
        assert!(state.should_send(2));

        let mut state = PipelineState::new();
        state.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 79, 100, 1)],
            ..Default::default()
        });
        assert!(!state.should_send(2));
        state.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 80, 100, 2)],
            ..Default::default()
        });
        assert!(state.should_send(2));

        let mut state = PipelineState::new();
        state.register_metrics(&Metrics {
            segments: vec![segment(1, SegmentState::Progress, 1, 100, 1)],
            ..Default::default()
        });
        state.register_abort(1);
        assert!(state.should_send(2));
    }
}
