//! Tenant-isolated conversation persistence
//!
//! The store trait is the persistence seam of the pipeline. Every operation
//! is tenant-scoped: ownership is verified before any message content is
//! read or written, and history queries filter by tenant at the query level.

mod memory;

pub use memory::MemoryConversationStore;

use async_trait::async_trait;

use crate::core::types::{
    Conversation, ConversationId, Feedback, InstanceId, Message, MessageDraft, TenantId, UserId,
};
use crate::utils::error::Result;

/// Persistence and retrieval of conversations and messages
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch an owned conversation or create a fresh one
    ///
    /// With a `conversation_id` whose stored tenant differs from
    /// `tenant_id`, fails with `ChatError::TenantMismatch` before any
    /// message content is read and without writing anything.
    async fn get_or_create(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        instance_id: InstanceId,
        conversation_id: Option<ConversationId>,
    ) -> Result<Conversation>;

    /// Append a message, assigning the next sequence number
    ///
    /// Atomic with respect to concurrent appends on the same conversation.
    /// Replaying a draft whose id is already stored returns the stored
    /// message unchanged, which makes persistence retries idempotent.
    async fn append(&self, conversation: &Conversation, draft: MessageDraft) -> Result<Message>;

    /// Most recent messages up to `window`, oldest first, for prompt building
    async fn context(&self, conversation: &Conversation, window: usize) -> Result<Vec<Message>>;

    /// Paginated message history, tenant-filtered at the query level
    async fn history(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        conversation_id: ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Record feedback for a message the tenant owns
    async fn add_feedback(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        feedback: Feedback,
    ) -> Result<Feedback>;
}
