//! Hosted chat-completions backend
//!
//! Talks to an OpenAI-style `/chat/completions` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::BackendConfig;
use crate::core::types::Message;
use crate::utils::error::{ChatError, Result};

use super::backend::{BackendError, BackendResponse, ChatBackend};

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// Backend for a hosted chat-completions API
pub struct HostedApiBackend {
    name: String,
    client: Client,
    api_base: String,
    api_key: Option<String>,
    model: String,
}

impl HostedApiBackend {
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
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn build_messages(&self, prompt: &str, context: &[Message]) -> Vec<serde_json::Value> {
        let mut messages: Vec<serde_json::Value> = context
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();
        messages.push(json!({ "role": "user", "content": prompt }));
        messages
    }
}

#[async_trait]
impl ChatBackend for HostedApiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> std::result::Result<BackendResponse, BackendError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": self.build_messages(prompt, context),
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
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

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::from_reqwest(&self.name, e))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse {
                backend: self.name.clone(),
                message: "response contained no choices".into(),
            })?;

        debug!(backend = %self.name, "hosted backend reply received");
        Ok(BackendResponse {
            content: choice.message.content,
            model_used: completion.model.unwrap_or_else(|| self.model.clone()),
            tokens_used: completion.usage.and_then(|u| u.total_tokens),
        })
    }
}
