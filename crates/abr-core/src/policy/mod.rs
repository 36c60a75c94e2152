//! Pluggable quality-selection algorithms consulted by [`crate::pipeline::SegmentProgress`],
//! plus Minerva's own top-level controller variant.

pub mod buffer_based;
pub mod minerva;
pub mod random;

pub use buffer_based::BufferBasedPolicy;
pub use minerva::{MinervaController, best_combo};
pub use random::RandomPolicy;
