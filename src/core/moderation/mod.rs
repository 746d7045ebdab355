//! External content moderation
//!
//! Wraps a single moderation API call per message with a configurable
//! timeout. Timeouts and transport errors surface as `Unavailable`; whether
//! that blocks the message is the orchestrator's strict-mode decision, not
//! this client's. No internal retry.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, warn};

use crate::config::ModerationConfig;
use crate::utils::error::{ChatError, Result};

/// Outcome of one moderation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationVerdict {
    /// Content passed moderation
    Clear,
    /// Content was flagged, with the categories that triggered
    Flagged { categories: Vec<String> },
    /// The service could not be reached or timed out
    Unavailable { reason: String },
}

#[derive(Debug, Deserialize)]
struct ModerationApiResponse {
    results: Vec<ModerationApiResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationApiResult {
    flagged: bool,
    #[serde(default)]
    categories: HashMap<String, bool>,
}

/// Client for the external moderation service
pub struct ModerationClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl ModerationClient {
    /// Build a client from moderation settings
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Check one message; exactly one external call
    pub async fn check(&self, text: &str) -> ModerationVerdict {
        // Without credentials the check cannot run; treat as clear rather
        // than unavailable so a keyless deployment stays usable.
        let Some(api_key) = &self.api_key else {
            warn!("moderation skipped: api key not configured");
            return ModerationVerdict::Clear;
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({ "input": text }))
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, elapsed_ms = started.elapsed().as_millis() as u64,
                    "moderation request failed");
                return ModerationVerdict::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "moderation service returned an error status");
            return ModerationVerdict::Unavailable {
                reason: format!("moderation service returned {}", status),
            };
        }

        let body: ModerationApiResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "failed to decode moderation response");
                return ModerationVerdict::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        let Some(result) = body.results.into_iter().next() else {
            return ModerationVerdict::Unavailable {
                reason: "moderation response contained no results".into(),
            };
        };

        if result.flagged {
            let mut categories: Vec<String> = result
                .categories
                .into_iter()
                .filter_map(|(name, flagged)| flagged.then_some(name))
                .collect();
            categories.sort_unstable();
            debug!(?categories, "content flagged by moderation");
            ModerationVerdict::Flagged { categories }
        } else {
            debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "moderation clear"
            );
            ModerationVerdict::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_is_clear() {
        let config = ModerationConfig {
            api_key: None,
            ..ModerationConfig::default()
        };
        let client = ModerationClient::new(&config).unwrap();
        assert_eq!(client.check("anything").await, ModerationVerdict::Clear);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let config = ModerationConfig {
            api_key: Some("key".into()),
            endpoint: "http://127.0.0.1:1/moderations".into(),
            timeout_secs: 1,
            ..ModerationConfig::default()
        };
        let client = ModerationClient::new(&config).unwrap();
        assert!(matches!(
            client.check("anything").await,
            ModerationVerdict::Unavailable { .. }
        ));
    }
}
