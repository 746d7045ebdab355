//! Configuration management for the pipeline
//!
//! Handles loading and validation of the filter rule file and the
//! pipeline settings. The filter file is JSON so operators can edit it
//! without a rebuild; reloads are applied as an atomic snapshot swap by
//! the filter engine.

pub mod models;

pub use models::{
    BackendConfig, BackendKind, FilterConfigFile, FilterRuleConfig, FilterSettings,
    GatewaySettings, ModerationConfig, PipelineConfig, RateLimitConfig, RuleAction,
};

use crate::utils::error::{ChatError, Result};
use std::path::Path;
use tracing::{debug, info};

impl FilterConfigFile {
    /// Load the filter configuration from a JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading filter configuration");

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ChatError::Config(format!(
                "failed to read filter config {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: FilterConfigFile = serde_json::from_str(&content).map_err(|e| {
            ChatError::Config(format!(
                "failed to parse filter config {}: {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;

        debug!(
            rules = config.regex_filters.len(),
            max_message_length = config.settings.max_message_length,
            "filter configuration loaded"
        );
        Ok(config)
    }

    /// Validate the rule list and global settings
    pub fn validate(&self) -> Result<()> {
        if self.settings.max_message_length == 0 {
            return Err(ChatError::Config(
                "max_message_length must be greater than 0".into(),
            ));
        }

        for rule in &self.regex_filters {
            if rule.name.is_empty() {
                return Err(ChatError::Config("filter rule with empty name".into()));
            }
            if rule.pattern.is_empty() {
                return Err(ChatError::Config(format!(
                    "filter rule '{}' has an empty pattern",
                    rule.name
                )));
            }
            if rule.action == RuleAction::Block && rule.replacement.is_some() {
                return Err(ChatError::Config(format!(
                    "block rule '{}' must not define a replacement",
                    rule.name
                )));
            }
        }

        let mut names: Vec<&str> = self.regex_filters.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.regex_filters.len() {
            return Err(ChatError::Config("duplicate filter rule names".into()));
        }

        Ok(())
    }
}

impl PipelineConfig {
    /// Validate pipeline-level settings
    pub fn validate(&self) -> Result<()> {
        if self.gateway.max_retries == 0 {
            return Err(ChatError::Config("max_retries must be at least 1".into()));
        }
        if self.context_window == 0 {
            return Err(ChatError::Config(
                "context_window must be greater than 0".into(),
            ));
        }
        if self.moderation.timeout_secs == 0 {
            return Err(ChatError::Config(
                "moderation timeout must be greater than 0".into(),
            ));
        }
        for backend in &self.backends {
            if backend.name.is_empty() {
                return Err(ChatError::Config("backend with empty name".into()));
            }
            if backend.api_base.is_empty() {
                return Err(ChatError::Config(format!(
                    "backend '{}' has an empty api_base",
                    backend.name
                )));
            }
        }
        Ok(())
    }
}
