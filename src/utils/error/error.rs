//! Error handling for the chat pipeline
//!
//! This module defines the error types used throughout the pipeline.

use crate::core::types::{ConversationId, MessageId, TenantId};
use thiserror::Error;

/// Result type alias for the pipeline
pub type Result<T> = std::result::Result<T, ChatError>;

/// Main error type for the chat pipeline
#[derive(Error, Debug)]
pub enum ChatError {
    /// Message empty or exceeds the configured length limit
    #[error("Validation error: {0}")]
    Validation(String),

    /// Content rejected by a block rule or the moderation service
    #[error("Policy blocked: {0}")]
    PolicyBlocked(String),

    /// Conversation ownership check failed
    #[error("Conversation {conversation_id} does not belong to tenant {tenant_id}")]
    TenantMismatch {
        conversation_id: ConversationId,
        tenant_id: TenantId,
    },

    /// Conversation does not exist
    #[error("Conversation not found: {0}")]
    ConversationNotFound(ConversationId),

    /// Message does not exist
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// Primary retries and the single fallback attempt are both exhausted
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Storage write failure after the internal retry
    #[error("Persistence error: {reason}")]
    Persistence {
        /// Id of the already-generated reply, kept for idempotent re-delivery
        message_id: Option<MessageId>,
        reason: String,
    },

    /// Moderation service unavailable while strict mode is enabled
    #[error("Moderation error: {0}")]
    Moderation(String),

    /// Request rejected by the rate limiter
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Whether the caller may retry the request as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::ModelUnavailable(_)
                | ChatError::Persistence { .. }
                | ChatError::Moderation(_)
                | ChatError::RateLimited(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ConversationId;

    #[test]
    fn test_retryable_classification() {
        assert!(ChatError::ModelUnavailable("down".into()).is_retryable());
        assert!(
            ChatError::Persistence {
                message_id: None,
                reason: "disk".into()
            }
            .is_retryable()
        );
        assert!(!ChatError::Validation("too long".into()).is_retryable());
        assert!(!ChatError::ConversationNotFound(ConversationId::new()).is_retryable());
    }
}
