//! Audit event sink
//!
//! Security-relevant decisions (blocks, sanitizations, tenant violations,
//! fallbacks) are reported here. Emission is fire-and-forget: a full or
//! closed sink must never delay or fail the request that produced the event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// A single audit event
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Sink accepting `(event_type, structured_payload)` pairs
pub trait AuditSink: Send + Sync {
    /// Report an event; must not block
    fn emit(&self, event_type: &str, payload: serde_json::Value);
}

/// Audit sink that forwards events to `tracing` from a background task
///
/// Events go through a bounded channel; when the buffer is full the event
/// is dropped and a warning logged, keeping the hot path non-blocking.
pub struct TracingAuditSink {
    sender: mpsc::Sender<AuditEvent>,
}

impl TracingAuditSink {
    /// Spawn the background drain task and return the sink
    pub fn new(buffer_size: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(buffer_size);

        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                info!(
                    target: "audit",
                    event_type = %event.event_type,
                    timestamp = %event.timestamp,
                    payload = %event.payload,
                    "audit event"
                );
            }
        });

        Self { sender }
    }
}

impl Default for TracingAuditSink {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl AuditSink for TracingAuditSink {
    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        let event = AuditEvent {
            event_type: event_type.to_string(),
            payload,
            timestamp: Utc::now(),
        };
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(event_type = %event.event_type, "audit buffer full, event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(event_type = %event.event_type, "audit channel closed, event dropped");
            }
        }
    }
}

/// Sink that discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event_type: &str, _payload: serde_json::Value) {}
}
