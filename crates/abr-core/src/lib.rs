//! Decision core for an adaptive-bitrate DASH-over-QUIC controller.
//!
//! Consumes client-reported playback telemetry and, for each upcoming
//! segment index, selects a representation quality. Optionally publishes
//! congestion-control link-weight hints derived from achieved throughput
//! and a utility curve (Minerva).
//!
//! The host owns the HTTP/QUIC plumbing, JSON decoding at the transport
//! boundary, on-disk caching, and worker orchestration; this crate only
//! ever sees already-decoded [`telemetry::Metrics`] batches and produces
//! [`telemetry::Decision`] values.

pub mod catalogue;
pub mod cc;
pub mod error;
pub mod metrics_store;
pub mod pipeline;
pub mod policy;
pub mod session;
pub mod telemetry;

pub use catalogue::{Catalogue, CatalogueConfig, VideoConfigEntry, VideoInfo};
pub use cc::CongestionHook;
pub use error::AbrError;
pub use metrics_store::MetricsStore;
pub use pipeline::{Controller, PipelineState, QualityPolicy, SegmentProgress};
pub use session::{AbrSession, PolicyKind};
pub use telemetry::{Decision, Metrics, Segment, SegmentState, Value};
