//! Scripted telemetry trace format: one JSON event per line, applied to a
//! session in order. This is a demo harness, not part of the decision core;
//! a real host would instead decode wire telemetry and call the same
//! `register_metrics`/`register_abort`/`decide` surface per request.

use abr_core::Metrics;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TraceEvent {
    /// A telemetry batch, same shape the wire JSON decodes into.
    Metrics { metrics: Metrics },
    /// A segment abort.
    Abort { index: i32 },
    /// Bytes acked by the (simulated) congestion controller since the last
    /// reset; only meaningful for the `minerva` policy.
    Acked { bytes: u64 },
    /// Calls `decide()` with no new telemetry; useful to observe the
    /// pipeline's idempotent behaviour or Minerva's interval ticks.
    Tick,
}

/// Parses a trace file's non-blank, non-comment (`#`-prefixed) lines into
/// [`TraceEvent`]s, in order.
pub fn parse_trace(source: &str) -> Result<Vec<TraceEvent>, serde_json::Error> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(serde_json::from_str)
        .collect()
}
