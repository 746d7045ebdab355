//! Configuration models
//!
//! Serde-backed structures for the filter rule file and the pipeline
//! settings. Defaults mirror the values the service ships with.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Action a filter rule takes when its pattern matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    /// Reject the whole message
    Block,
    /// Replace matched spans in place
    Sanitize,
}

/// One entry of the ordered filter rule list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    pub name: String,
    /// Unanchored regex, matched case-insensitively unless `case_sensitive`
    pub pattern: String,
    pub action: RuleAction,
    /// User-facing message returned on block or carried as a warning
    pub message: String,
    /// Replacement text for sanitize rules, defaults to `***`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

/// Global filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSettings {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
    #[serde(default = "default_true")]
    pub enable_logging: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            max_message_length: default_max_message_length(),
            enable_logging: true,
        }
    }
}

/// Filter configuration file: ordered rules plus global settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfigFile {
    #[serde(default)]
    pub regex_filters: Vec<FilterRuleConfig>,
    #[serde(default)]
    pub settings: FilterSettings,
}

/// External moderation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Treat an unavailable moderation service as a block
    #[serde(default)]
    pub strict_mode: bool,
    #[serde(default = "default_moderation_endpoint")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_moderation_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strict_mode: false,
            endpoint: default_moderation_endpoint(),
            api_key: None,
            timeout_secs: default_moderation_timeout_secs(),
        }
    }
}

impl ModerationConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Kind of model backend to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hosted chat-completions HTTP API
    HostedApi,
    /// Local inference service speaking the internal generate protocol
    LocalInference,
}

/// Settings for one model backend, listed in preference order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub kind: BackendKind,
    pub api_base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

/// Retry and fallback settings for the model gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewaySettings {
    /// Attempts against the primary backend before falling back
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

/// Per-key request rate limiting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rpm")]
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: default_rpm(),
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Number of prior turns retrieved as model context
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Model backends in preference order; the first is the primary
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            moderation: ModerationConfig::default(),
            gateway: GatewaySettings::default(),
            rate_limit: RateLimitConfig::default(),
            context_window: default_context_window(),
            backends: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_message_length() -> usize {
    4096
}

fn default_moderation_endpoint() -> String {
    "https://api.openai.com/v1/moderations".to_string()
}

fn default_moderation_timeout_secs() -> u64 {
    10
}

fn default_backend_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    200
}

fn default_rpm() -> u32 {
    60
}

fn default_context_window() -> usize {
    10
}
