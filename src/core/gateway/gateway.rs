//! Model gateway
//!
//! Holds the backends in preference order. The primary gets the full retry
//! budget; when it is exhausted the secondary is invoked exactly once. Only
//! exhaustion of both paths produces `ChatError::ModelUnavailable`.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::core::types::Message;
use crate::monitoring::AuditSink;
use crate::utils::error::{ChatError, Result};

use super::backend::{BackendResponse, ChatBackend};
use super::retry::{run_with_retry, RetryPolicy};

/// How many invocation records are retained for inspection
const RECORD_CAPACITY: usize = 256;

/// Outcome of one backend engagement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    Success,
    Failure(String),
}

/// Transient audit record of one backend engagement
#[derive(Debug, Clone)]
pub struct InvocationRecord {
    pub backend: String,
    pub attempts: u32,
    pub outcome: InvocationOutcome,
    pub latency: Duration,
    pub used_fallback: bool,
}

/// Gateway over an ordered list of interchangeable backends
pub struct ModelGateway {
    backends: Vec<Arc<dyn ChatBackend>>,
    policy: RetryPolicy,
    audit: Arc<dyn AuditSink>,
    records: Mutex<Vec<InvocationRecord>>,
}

impl ModelGateway {
    /// Build a gateway; the backend list order is the preference order
    pub fn new(
        backends: Vec<Arc<dyn ChatBackend>>,
        policy: RetryPolicy,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self> {
        if backends.is_empty() {
            return Err(ChatError::Config(
                "model gateway requires at least one backend".into(),
            ));
        }
        Ok(Self {
            backends,
            policy,
            audit,
            records: Mutex::new(Vec::new()),
        })
    }

    /// Recent invocation records, oldest first
    pub fn recent_invocations(&self) -> Vec<InvocationRecord> {
        self.records.lock().clone()
    }

    fn record(&self, record: InvocationRecord) {
        let mut records = self.records.lock();
        if records.len() >= RECORD_CAPACITY {
            records.remove(0);
        }
        records.push(record);
    }

    /// Reorder so a preferred backend (by name) becomes the primary
    fn ordered<'a>(&'a self, preference: Option<&str>) -> Vec<&'a Arc<dyn ChatBackend>> {
        let mut ordered: Vec<&Arc<dyn ChatBackend>> = self.backends.iter().collect();
        if let Some(name) = preference {
            if let Some(pos) = ordered.iter().position(|b| b.name() == name) {
                let preferred = ordered.remove(pos);
                ordered.insert(0, preferred);
            }
        }
        ordered
    }

    /// Generate a reply, retrying the primary and falling back once
    pub async fn invoke(
        &self,
        prompt: &str,
        context: &[Message],
        backend_preference: Option<&str>,
    ) -> Result<BackendResponse> {
        let ordered = self.ordered(backend_preference);
        let primary = ordered[0];

        let started = Instant::now();
        let (primary_result, attempts) = run_with_retry(&self.policy, |_attempt| {
            primary.generate(prompt, context)
        })
        .await;
        let primary_latency = started.elapsed();

        match primary_result {
            Ok(response) => {
                self.record(InvocationRecord {
                    backend: primary.name().to_string(),
                    attempts,
                    outcome: InvocationOutcome::Success,
                    latency: primary_latency,
                    used_fallback: false,
                });
                return Ok(response);
            }
            Err(error) => {
                warn!(
                    backend = primary.name(),
                    attempts,
                    error = %error,
                    "primary backend exhausted retries"
                );
                self.record(InvocationRecord {
                    backend: primary.name().to_string(),
                    attempts,
                    outcome: InvocationOutcome::Failure(error.to_string()),
                    latency: primary_latency,
                    used_fallback: false,
                });
            }
        }

        let Some(fallback) = ordered.get(1) else {
            return Err(ChatError::ModelUnavailable(format!(
                "backend '{}' exhausted {} attempts and no fallback is configured",
                primary.name(),
                attempts
            )));
        };

        info!(
            from = primary.name(),
            to = fallback.name(),
            "invoking fallback backend"
        );
        self.audit.emit(
            "model_fallback",
            json!({ "from": primary.name(), "to": fallback.name() }),
        );

        // Exactly one attempt on the fallback; its retries would only delay
        // the error the caller is already waiting on.
        let started = Instant::now();
        let fallback_result = fallback.generate(prompt, context).await;
        let fallback_latency = started.elapsed();

        match fallback_result {
            Ok(response) => {
                self.record(InvocationRecord {
                    backend: fallback.name().to_string(),
                    attempts: 1,
                    outcome: InvocationOutcome::Success,
                    latency: fallback_latency,
                    used_fallback: true,
                });
                Ok(response)
            }
            Err(error) => {
                self.record(InvocationRecord {
                    backend: fallback.name().to_string(),
                    attempts: 1,
                    outcome: InvocationOutcome::Failure(error.to_string()),
                    latency: fallback_latency,
                    used_fallback: true,
                });
                Err(ChatError::ModelUnavailable(format!(
                    "primary '{}' and fallback '{}' both failed: {}",
                    primary.name(),
                    fallback.name(),
                    error
                )))
            }
        }
    }
}
