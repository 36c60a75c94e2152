//! Fatal, construction-time errors.
//!
//! Everything recoverable (unknown segment index, division-by-zero edges,
//! a not-yet-available CC hook, ...) is absorbed inside the core and never
//! surfaces as an `AbrError`; only misconfiguration detected at construction
//! time is fatal.

#[derive(Debug, thiserror::Error)]
pub enum AbrError {
    #[error("catalogue has no qualities configured")]
    EmptyCatalogue,

    #[error("quality {quality} has {actual} segments, expected {expected}")]
    MismatchedSegmentCount {
        quality: usize,
        expected: usize,
        actual: usize,
    },

    #[error("policy selector {0:?} is not implemented by this core")]
    UnsupportedPolicy(String),
}
