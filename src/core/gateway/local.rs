//! Local inference backend
//!
//! Talks to the in-house inference service's `/api/v1/generate` endpoint,
//! used as an on-premise alternative to hosted APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;
use crate::core::types::Message;
use crate::utils::error::{ChatError, Result};

use super::backend::{BackendError, BackendResponse, ChatBackend};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    message: &'a str,
    context: Vec<ContextTurn<'a>>,
    model_type: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ContextTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    content: String,
    model_used: String,
    #[serde(default)]
    tokens_used: Option<u32>,
}

/// Backend for the local inference service
pub struct LocalInferenceBackend {
    name: String,
    client: Client,
    api_base: String,
    model: String,
}

impl LocalInferenceBackend {
    /// Build the backend from configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ChatError::Http)?;

        Ok(Self {
            name: config.name.clone(),
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for LocalInferenceBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> std::result::Result<BackendResponse, BackendError> {
        let url = format!("{}/api/v1/generate", self.api_base);

        let roles: Vec<String> = context.iter().map(|m| m.role.to_string()).collect();
        let body = GenerateRequest {
            message: prompt,
            context: context
                .iter()
                .zip(roles.iter())
                .map(|(m, role)| ContextTurn {
                    role,
                    content: &m.content,
                })
                .collect(),
            model_type: &self.model,
            max_tokens: 1000,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::from_reqwest(&self.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                backend: self.name.clone(),
                status: status.as_u16(),
                message,
            });
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(&self.name, e))?;

        debug!(backend = %self.name, model = %generated.model_used, "local backend reply received");
        Ok(BackendResponse {
            content: generated.content,
            model_used: generated.model_used,
            tokens_used: generated.tokens_used,
        })
    }
}
