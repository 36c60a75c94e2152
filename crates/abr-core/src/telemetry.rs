//! Wire-shaped telemetry types reported by the DASH front end.
//!
//! These mirror the JSON body described in the host's request schema; they
//! derive `serde::Deserialize` directly so a host can decode the wire body
//! straight into them rather than hand-rolling a parser at the boundary.

use serde::{Deserialize, Serialize};

/// A timestamped scalar sample (dropped frames, player time, buffer level).
///
/// Ordering and equality are by `timestamp`; `value` is carried along but
/// never compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Value {
    pub value: i32,
    pub timestamp: i32,
}

impl Value {
    pub const fn zero() -> Self {
        Self { value: 0, timestamp: 0 }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::zero()
    }
}

/// Download state of a single segment index, as last reported by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentState {
    Loading,
    Downloaded,
    Progress,
}

/// A single segment-progress telemetry entry.
///
/// Invariants (enforced by callers, not this type): `loaded <= total`,
/// `total > 0` when `state == Progress`, `index >= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Segment {
    pub index: i32,
    pub timestamp: i32,
    pub loaded: u64,
    pub total: u64,
    pub quality: i32,
    pub state: SegmentState,
}

impl Segment {
    /// Fraction downloaded, in `(0, 1]`. Returns `0.0` for a degenerate
    /// `total == 0` rather than dividing by zero.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.loaded as f64 / self.total as f64
        }
    }
}

/// A batch of telemetry since the last report. Entries within a channel may
/// arrive out of timestamp order; the pipeline merge rules account for that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default)]
    pub dropped_frames: Vec<Value>,
    #[serde(default)]
    pub player_time: Vec<Value>,
    #[serde(default)]
    pub buffer_level: Vec<Value>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// The outcome of a `decide()` call: which quality to fetch for `index`.
///
/// The all-zero value is the reserved no-op sentinel emitted by policies
/// (Minerva) that don't drive per-segment selection directly; hosts must
/// ignore it rather than treat it as a real decision for index 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Decision {
    pub index: i32,
    pub quality: i32,
    pub timestamp: i32,
}

impl Decision {
    pub const fn noop() -> Self {
        Self { index: 0, quality: 0, timestamp: 0 }
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::noop()
    }
}
