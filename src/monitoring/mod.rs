//! Observability for the pipeline
//!
//! Audit events, metrics counters, and tracing initialization.

pub mod audit;
pub mod metrics;

pub use audit::{AuditEvent, AuditSink, NoopAuditSink, TracingAuditSink};
pub use metrics::{MetricsSink, TracingMetricsSink};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with an env-filter subscriber
///
/// Reads `RUST_LOG`, defaulting to `info`. Safe to call once at startup;
/// returns quietly if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
