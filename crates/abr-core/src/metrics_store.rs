//! Thread-safe ingress queue for telemetry batches and segment aborts.
//!
//! One [`MetricsStore`] is shared between the request-handler threads that
//! call [`MetricsStore::add_metrics`] / [`MetricsStore::add_abort`] and the
//! single controller thread that periodically drains it. A single
//! `parking_lot::Mutex` protects both queues; acquisitions are append-or-swap
//! only, never blocking I/O.

use parking_lot::Mutex;
use tracing::trace;

use crate::telemetry::Metrics;

#[derive(Default)]
struct Inner {
    metrics: Vec<Metrics>,
    aborts: Vec<i32>,
}

/// Thread-safe merge point for out-of-order telemetry snapshots.
#[derive(Default)]
pub struct MetricsStore {
    inner: Mutex<Inner>,
}

impl MetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a telemetry batch. Called from request-handler threads.
    pub fn add_metrics(&self, metrics: Metrics) {
        let mut inner = self.inner.lock();
        inner.metrics.push(metrics);
    }

    /// Atomically take and clear all pending telemetry batches. Called from
    /// the controller thread.
    pub fn drain_metrics(&self) -> Vec<Metrics> {
        let mut inner = self.inner.lock();
        let drained = std::mem::take(&mut inner.metrics);
        trace!(count = drained.len(), "drained metrics batches");
        drained
    }

    /// Record a segment abort. Called from request-handler threads.
    pub fn add_abort(&self, index: i32) {
        let mut inner = self.inner.lock();
        inner.aborts.push(index);
    }

    /// Atomically take and clear all pending aborts. Called from the
    /// controller thread.
    pub fn drain_aborts(&self) -> Vec<i32> {
        let mut inner = self.inner.lock();
        let drained = std::mem::take(&mut inner.aborts);
        trace!(count = drained.len(), "drained aborts");
        drained
    }
}
