//! Metrics sink
//!
//! Counter and latency recording behind a trait so the boundary layer can
//! plug in its own collector. The default implementation emits `tracing`
//! events at debug level.

use std::time::Duration;
use tracing::debug;

/// Sink for counters and latency histograms
pub trait MetricsSink: Send + Sync {
    /// Increment a named counter
    fn incr_counter(&self, name: &str, value: u64);

    /// Record a latency observation
    fn record_latency(&self, name: &str, latency: Duration);
}

/// Metrics sink backed by `tracing` debug events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn incr_counter(&self, name: &str, value: u64) {
        debug!(target: "metrics", counter = name, value, "counter");
    }

    fn record_latency(&self, name: &str, latency: Duration) {
        debug!(
            target: "metrics",
            histogram = name,
            latency_ms = latency.as_millis() as u64,
            "latency"
        );
    }
}
