//! Capability seam into the congestion controller.
//!
//! Minerva is parameterised over any implementation rather than reaching for
//! a process-wide singleton; a session owns its hook via plain borrowing, and
//! the controller thread is the only caller.

/// Observables and actuator exposed by the congestion controller.
pub trait CongestionHook: Send {
    /// Smoothed minimum RTT in milliseconds, if known yet.
    fn min_rtt_ms(&self) -> Option<u32>;

    /// Bytes acked since the last [`CongestionHook::reset_acked_bytes`] call.
    fn acked_bytes(&self) -> u64;

    /// Resets the acked-byte counter for the next measurement window.
    fn reset_acked_bytes(&mut self);

    /// Publishes a new link-weight hint.
    fn set_link_weight(&mut self, weight: f64);
}
