//! Minerva: a weight-update variant that drives the congestion controller
//! instead of picking a quality directly. `decide()` always returns the
//! no-op [`Decision`]; the real output is the periodic `set_link_weight`
//! call on the [`CongestionHook`] it was built with.
//!
//! Unlike [`crate::policy::RandomPolicy`] / [`crate::policy::BufferBasedPolicy`],
//! Minerva does not implement [`QualityPolicy`] and is not composed inside
//! [`SegmentProgress`]. It is its own top-level [`Controller`], since it
//! drives the congestion controller rather than picking a per-segment
//! quality.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::catalogue::Catalogue;
use crate::cc::CongestionHook;
use crate::pipeline::Controller;
use crate::telemetry::{Decision, Metrics, Segment, SegmentState};

const UPDATE_INTERVAL_FACTOR_MS: i64 = 25;
const MIN_RTT_START_MS: i64 = 10;
const MAX_RTT_START_MS: i64 = 100;
const VARIANCE_QUEUE_LENGTH: usize = 4;
const INIT_MOVING_AVERAGE_RATE: i32 = -1;
const MOVING_AVERAGE_RATE_PROPORTION: f64 = 0.9;
const REBUF_PENALTY: f64 = 4.3;
const SMOOTH_PENALTY: f64 = 1.0;
const HORIZON: usize = 5;

/// Wall-clock source for Minerva's interval timer, abstracted so tests can
/// drive the state machine deterministically instead of sleeping on a real
/// clock. Production code uses [`MonotonicClock`].
pub trait Clock: Send {
    fn now_ms(&self) -> i64;
}

/// Milliseconds elapsed since construction, backed by [`std::time::Instant`].
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }
}

/// Minerva's weight-update controller, generic over the congestion-control
/// capability it drives and (for tests) the clock it reads.
///
/// Holds a non-owning capability handle to the congestion controller rather
/// than reaching for a process-wide singleton: the host constructs one
/// `MinervaController` per session and is responsible for the hook
/// outliving it.
pub struct MinervaController<H: CongestionHook, C: Clock = MonotonicClock> {
    catalogue: Arc<Catalogue>,
    hook: H,
    clock: C,
    last_segment: HashMap<i32, Segment>,
    last_index: i32,
    last_timestamp: i32,
    past_rates: VecDeque<i32>,
    moving_average_rate: i32,
    /// Anchor timestamp (clock-relative ms) of the current update interval.
    timestamp_ms: Option<i64>,
    /// Length of the current update interval, derived from `min_rtt`.
    interval_ms: Option<i64>,
    started_rate_update: bool,
}

impl<H: CongestionHook> MinervaController<H, MonotonicClock> {
    pub fn new(catalogue: Arc<Catalogue>, hook: H) -> Self {
        Self::with_clock(catalogue, hook, MonotonicClock::new())
    }
}

impl<H: CongestionHook, C: Clock> MinervaController<H, C> {
    pub fn with_clock(catalogue: Arc<Catalogue>, hook: H, clock: C) -> Self {
        Self {
            catalogue,
            hook,
            clock,
            last_segment: HashMap::new(),
            last_index: -1,
            last_timestamp: 0,
            past_rates: VecDeque::with_capacity(VARIANCE_QUEUE_LENGTH),
            moving_average_rate: INIT_MOVING_AVERAGE_RATE,
            timestamp_ms: None,
            interval_ms: None,
            started_rate_update: false,
        }
    }

    /// Mutable access to the congestion-control hook this controller
    /// drives, for hosts that need to feed it observations (e.g. acked
    /// bytes) outside the `Controller` surface.
    pub fn hook_mut(&mut self) -> &mut H {
        &mut self.hook
    }

    /// `clamp(min_rtt_ms, 10, 100) * 25`, undefined while `min_rtt` is
    /// unknown: the timer simply stays un-armed until it is.
    fn update_interval_ms(&self) -> Option<i64> {
        let min_rtt = self.hook.min_rtt_ms()? as i64;
        let clamped = min_rtt.clamp(MIN_RTT_START_MS, MAX_RTT_START_MS);
        Some(clamped * UPDATE_INTERVAL_FACTOR_MS)
    }

    fn on_start_rate_update(&mut self) {
        self.hook.reset_acked_bytes();
    }

    fn on_weight_update(&mut self) {
        let interval = self.interval_ms.unwrap_or(0) as f64;
        let half_sec = interval / 2000.0;
        let current_rate_kbps = if half_sec > 0.0 {
            (8.0 * self.hook.acked_bytes() as f64 / half_sec / 1000.0) as i32
        } else {
            0
        };

        self.past_rates.push_back(current_rate_kbps);
        if self.past_rates.len() > VARIANCE_QUEUE_LENGTH {
            self.past_rates.pop_front();
        }

        let conservative = self.conservative_rate();
        self.moving_average_rate = if self.moving_average_rate == INIT_MOVING_AVERAGE_RATE {
            conservative
        } else {
            (MOVING_AVERAGE_RATE_PROPORTION * self.moving_average_rate as f64
                + (1.0 - MOVING_AVERAGE_RATE_PROPORTION) * conservative as f64) as i32
        };

        let utility = self.compute_utility();
        if utility != 0.0 {
            let link_weight = self.moving_average_rate as f64 / utility;
            debug!(rate = self.moving_average_rate, utility, link_weight, "minerva weight update");
            self.hook.set_link_weight(link_weight);
        }
    }

    /// `0.8 * back` below the variance-window cap; once the window is full,
    /// `max(0.8 * back, back - 0.5 * stddev)`.
    fn conservative_rate(&self) -> i32 {
        let Some(&back) = self.past_rates.back() else {
            return 0;
        };
        if self.past_rates.len() < VARIANCE_QUEUE_LENGTH {
            return (0.8 * back as f64) as i32;
        }

        let mean = self.past_rates.iter().map(|&r| r as f64).sum::<f64>() / self.past_rates.len() as f64;
        let variance = self
            .past_rates
            .iter()
            .map(|&r| (r as f64 - mean).powi(2))
            .sum::<f64>()
            / self.past_rates.len() as f64;
        let stddev = variance.sqrt();

        ((0.8 * back as f64).max(back as f64 - 0.5 * stddev)) as i32
    }

    /// Interpolates VMAF at the current `moving_average_rate`, using the
    /// last segment index observed in `Loading` state. Returns the neutral
    /// value `0.0` when that precondition isn't met yet rather than
    /// erroring.
    fn compute_utility(&self) -> f64 {
        if self.last_index == -1 {
            return 0.0;
        }
        let index = self.last_index as usize;
        let k = self.catalogue.quality_count();
        let n = self.catalogue.segment_count();
        if k == 0 || n < 2 {
            return 0.0;
        }

        let mut rates_kbps = Vec::with_capacity(k);
        let mut vmaf_at_index = Vec::with_capacity(k);
        for q in 0..k {
            let Some(current) = self.catalogue.info(q, index) else {
                return 0.0;
            };
            // Fall back one index for the segment-length measurement when
            // there's no next segment to measure against.
            let ref_index = if index + 1 < n { index } else { n.saturating_sub(2) };
            let (Some(at_ref), Some(next)) =
                (self.catalogue.info(q, ref_index), self.catalogue.info(q, ref_index + 1))
            else {
                return 0.0;
            };
            let seg_len_sec = next.start_time - at_ref.start_time;
            if seg_len_sec <= 0.0 {
                return 0.0;
            }
            rates_kbps.push(8.0 * current.size as f64 / seg_len_sec / 1000.0);
            vmaf_at_index.push(current.vmaf);
        }

        let rate = self.moving_average_rate as f64;
        if rate <= rates_kbps[0] {
            return vmaf_at_index[0];
        }
        if rate >= rates_kbps[k - 1] {
            return vmaf_at_index[k - 1];
        }
        for q in 0..k - 1 {
            if rates_kbps[q] <= rate && rate <= rates_kbps[q + 1] {
                let (x1, x2) = (rates_kbps[q], rates_kbps[q + 1]);
                let (y1, y2) = (vmaf_at_index[q], vmaf_at_index[q + 1]);
                if (x2 - x1).abs() < f64::EPSILON {
                    return y1;
                }
                return y1 + (rate - x1) / (x2 - x1) * (y2 - y1);
            }
        }
        vmaf_at_index[0]
    }
}

impl<H: CongestionHook, C: Clock> Controller for MinervaController<H, C> {
    fn register_metrics(&mut self, metrics: &Metrics) {
        for segment in &metrics.segments {
            self.last_timestamp = self.last_timestamp.max(segment.timestamp);
            if segment.state == SegmentState::Loading {
                self.last_segment.insert(segment.index, *segment);
                self.last_index = self.last_index.max(segment.index);
            }
        }
    }

    /// Minerva drives the congestion-control hook, not per-segment
    /// emission, so aborts don't affect it; this is a documented no-op.
    fn register_abort(&mut self, _index: i32) {}

    fn decide(&mut self) -> Decision {
        let Some(interval) = self.update_interval_ms() else {
            return Decision::noop();
        };

        if self.interval_ms.is_none() {
            self.interval_ms = Some(interval);
            self.timestamp_ms = Some(self.clock.now_ms());
            return Decision::noop();
        }

        let now = self.clock.now_ms();
        let anchor = self.timestamp_ms.unwrap_or(now);
        let elapsed = now - anchor;
        let window = self.interval_ms.unwrap_or(interval);

        if elapsed > window / 2 && !self.started_rate_update {
            self.on_start_rate_update();
            self.started_rate_update = true;
        }

        if elapsed > window {
            self.on_weight_update();
            self.started_rate_update = false;
            self.interval_ms = self.update_interval_ms();
            self.timestamp_ms = Some(self.clock.now_ms());
        }

        Decision::noop()
    }
}

/// The reward-search kernel used by Minerva variants that pick a quality
/// directly rather than only publishing a link weight. An explicit
/// iterative Cartesian product over `{0..K}^horizon`, never recursive, so
/// `horizon` can't blow the stack.
///
/// Bounds each simulated chunk against the catalogue's per-quality segment
/// length and simply stops growing the simulated buffer once a combination
/// runs past the catalogue's end, rather than indexing out of range.
pub fn best_combo(catalogue: &Catalogue, start_index: usize, last_quality: usize, start_buffer_sec: f64, download_rate_mbps: f64) -> usize {
    let k = catalogue.quality_count();
    if k == 0 {
        return 0;
    }
    let bitrate_array = catalogue.bitrate_array();
    let last_quality = last_quality.min(k - 1);

    let total_combos = k.pow(HORIZON as u32);
    let mut max_reward = 0.0_f64;
    let mut best_quality = 0usize;
    let mut combo = vec![0usize; HORIZON];

    for combo_id in 0..total_combos {
        let mut rem = combo_id;
        for slot in combo.iter_mut() {
            *slot = rem % k;
            rem /= k;
        }

        let mut buffer = start_buffer_sec;
        let mut rebuffer = 0.0_f64;
        let mut bitrate_sum = 0.0_f64;
        let mut smooth_diff = 0.0_f64;
        let mut prev_quality = last_quality;

        for (position, &chunk_quality) in combo.iter().enumerate() {
            let current_index = start_index + position;
            let Some(current) = catalogue.info(chunk_quality, current_index) else {
                break;
            };

            let size_mb = 8.0 * current.size as f64 / 1_000_000.0;
            let download_time = if download_rate_mbps > 0.0 { size_mb / download_rate_mbps } else { 0.0 };
            if buffer < download_time {
                rebuffer += download_time - buffer;
                buffer = 0.0;
            } else {
                buffer -= download_time;
            }
            if let Some(next) = catalogue.info(chunk_quality, current_index + 1) {
                buffer += next.start_time - current.start_time;
            }

            bitrate_sum += bitrate_array[chunk_quality] as f64;
            smooth_diff += (bitrate_array[chunk_quality] - bitrate_array[prev_quality]).abs() as f64;
            prev_quality = chunk_quality;
        }

        let reward = bitrate_sum / 1000.0 - REBUF_PENALTY * rebuffer - SMOOTH_PENALTY * smooth_diff / 1000.0;
        if reward > max_reward {
            max_reward = reward;
            best_quality = combo[0];
        }
    }

    if max_reward == 0.0 {
        warn!(start_index, "reward search found no combination with positive reward, falling back to lowest quality");
    }
    best_quality
}
