//! A trace-driven [`CongestionHook`] for the CLI harness: `min_rtt` is fixed
//! at startup (the CLI doesn't run a real congestion controller), and
//! `acked_bytes` accumulates from `acked` trace events until the pipeline
//! resets it.

use abr_core::CongestionHook;
use tracing::info;

pub struct TraceCongestionHook {
    min_rtt_ms: Option<u32>,
    acked_bytes: u64,
}

impl TraceCongestionHook {
    pub fn new(min_rtt_ms: Option<u32>) -> Self {
        Self { min_rtt_ms, acked_bytes: 0 }
    }

    pub fn add_acked_bytes(&mut self, bytes: u64) {
        self.acked_bytes += bytes;
    }
}

impl CongestionHook for TraceCongestionHook {
    fn min_rtt_ms(&self) -> Option<u32> {
        self.min_rtt_ms
    }

    fn acked_bytes(&self) -> u64 {
        self.acked_bytes
    }

    fn reset_acked_bytes(&mut self) {
        self.acked_bytes = 0;
    }

    fn set_link_weight(&mut self, weight: f64) {
        info!(weight, "congestion controller link weight updated");
    }
}
