//! Core type definitions
//!
//! Identifiers, conversation entities, and the request/response types
//! exchanged with the boundary layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random id
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Opaque tenant identifier, the isolation boundary
    TenantId
);
id_type!(
    /// User identifier within a tenant
    UserId
);
id_type!(
    /// Conversation identifier
    ConversationId
);
id_type!(
    /// Message identifier
    MessageId
);
id_type!(
    /// Chatbot instance identifier
    InstanceId
);

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// A conversation thread between one user and one chatbot instance
///
/// The tenant id is fixed at creation and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub instance_id: InstanceId,
    pub created_at: DateTime<Utc>,
}

/// A persisted message within a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    /// Strictly increasing, gap-free within the conversation
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A message awaiting persistence
///
/// The id is minted by the caller so a failed write can be replayed
/// idempotently: appending the same draft twice stores it once.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub id: MessageId,
    pub role: MessageRole,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

impl MessageDraft {
    /// Create a draft with a fresh message id
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            metadata: None,
        }
    }

    /// Attach structured metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Already-authenticated identity and tenant context
///
/// Token verification happens upstream; the pipeline trusts this struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestIdentity {
    pub tenant_id: TenantId,
    pub user_id: UserId,
}

/// Inbound chat request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    pub chatbot_instance_id: InstanceId,
}

/// Metadata attached to a chat response when a filter acted on the input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// Set when the message was rejected by policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_block: Option<bool>,
    /// Set when sanitize rules rewrote part of the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitization_warning: Option<String>,
}

impl ResponseMetadata {
    /// Whether any field is populated
    pub fn is_empty(&self) -> bool {
        self.filter_block.is_none() && self.sanitization_warning.is_none()
    }
}

/// Outbound chat response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message_id: MessageId,
    /// Absent when the request was blocked before a conversation existed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    pub content: String,
    pub role: MessageRole,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "ResponseMetadata::is_empty")]
    pub metadata: ResponseMetadata,
}

/// User feedback on a single assistant message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub message_id: MessageId,
    pub user_id: UserId,
    /// Rating on a 1..=5 scale
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
