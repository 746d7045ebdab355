//! In-memory conversation store
//!
//! Arena keyed by conversation id. Each conversation owns an async mutex,
//! so appends on the same conversation serialize while different
//! conversations proceed fully in parallel. Sequence numbers are assigned
//! under that lock and are therefore gap-free and strictly increasing.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::types::{
    Conversation, ConversationId, Feedback, InstanceId, Message, MessageDraft, TenantId, UserId,
};
use crate::monitoring::AuditSink;
use crate::utils::error::{ChatError, Result};

use super::ConversationStore;

#[derive(Debug)]
struct ConversationEntry {
    conversation: Conversation,
    messages: Vec<Message>,
    feedback: Vec<Feedback>,
    next_seq: u64,
}

/// Conversation store backed by an in-process arena
pub struct MemoryConversationStore {
    conversations: DashMap<ConversationId, Arc<Mutex<ConversationEntry>>>,
    audit: Arc<dyn AuditSink>,
}

impl MemoryConversationStore {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self {
            conversations: DashMap::new(),
            audit,
        }
    }

    /// Look up an entry, enforcing tenant ownership before anything else
    ///
    /// The tenant check reads only the conversation header, never message
    /// content. A mismatch is reported as a security event.
    async fn checked_entry(
        &self,
        conversation_id: ConversationId,
        tenant_id: TenantId,
    ) -> Result<Arc<Mutex<ConversationEntry>>> {
        let entry = self
            .conversations
            .get(&conversation_id)
            .map(|e| e.clone())
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;

        let owner = entry.lock().await.conversation.tenant_id;
        if owner != tenant_id {
            warn!(
                conversation_id = %conversation_id,
                tenant_id = %tenant_id,
                "tenant mismatch on conversation access"
            );
            self.audit.emit(
                "security_violation",
                json!({
                    "kind": "tenant_mismatch",
                    "conversation_id": conversation_id,
                    "tenant_id": tenant_id,
                }),
            );
            return Err(ChatError::TenantMismatch {
                conversation_id,
                tenant_id,
            });
        }

        Ok(entry)
    }
}

#[async_trait::async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn get_or_create(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        instance_id: InstanceId,
        conversation_id: Option<ConversationId>,
    ) -> Result<Conversation> {
        if let Some(id) = conversation_id {
            let entry = self.checked_entry(id, tenant_id).await?;
            let guard = entry.lock().await;
            return Ok(guard.conversation.clone());
        }

        let conversation = Conversation {
            id: ConversationId::new(),
            tenant_id,
            user_id,
            instance_id,
            created_at: Utc::now(),
        };

        debug!(conversation_id = %conversation.id, tenant_id = %tenant_id, "conversation created");
        self.conversations.insert(
            conversation.id,
            Arc::new(Mutex::new(ConversationEntry {
                conversation: conversation.clone(),
                messages: Vec::new(),
                feedback: Vec::new(),
                next_seq: 1,
            })),
        );

        Ok(conversation)
    }

    async fn append(&self, conversation: &Conversation, draft: MessageDraft) -> Result<Message> {
        let entry = self
            .checked_entry(conversation.id, conversation.tenant_id)
            .await?;
        let mut guard = entry.lock().await;

        // Idempotent replay: a draft already stored is returned as-is.
        if let Some(existing) = guard.messages.iter().find(|m| m.id == draft.id) {
            return Ok(existing.clone());
        }

        let message = Message {
            id: draft.id,
            conversation_id: conversation.id,
            role: draft.role,
            content: draft.content,
            seq: guard.next_seq,
            created_at: Utc::now(),
            metadata: draft.metadata,
        };
        guard.next_seq += 1;
        guard.messages.push(message.clone());

        Ok(message)
    }

    async fn context(&self, conversation: &Conversation, window: usize) -> Result<Vec<Message>> {
        let entry = self
            .checked_entry(conversation.id, conversation.tenant_id)
            .await?;
        let guard = entry.lock().await;

        let skip = guard.messages.len().saturating_sub(window);
        Ok(guard.messages[skip..].to_vec())
    }

    async fn history(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        conversation_id: ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>> {
        let entry = self.checked_entry(conversation_id, tenant_id).await?;
        let guard = entry.lock().await;

        // A different user's conversation inside the same tenant is
        // reported as absent rather than as a permission failure.
        if guard.conversation.user_id != user_id {
            return Err(ChatError::ConversationNotFound(conversation_id));
        }

        Ok(guard
            .messages
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn add_feedback(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        feedback: Feedback,
    ) -> Result<Feedback> {
        let entry = self.checked_entry(conversation_id, tenant_id).await?;
        let mut guard = entry.lock().await;

        if !guard.messages.iter().any(|m| m.id == feedback.message_id) {
            return Err(ChatError::MessageNotFound(feedback.message_id));
        }

        guard.feedback.push(feedback.clone());
        debug!(message_id = %feedback.message_id, rating = feedback.rating, "feedback recorded");
        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::MessageRole;
    use crate::monitoring::NoopAuditSink;

    fn store() -> MemoryConversationStore {
        MemoryConversationStore::new(Arc::new(NoopAuditSink))
    }

    async fn new_conversation(store: &MemoryConversationStore) -> Conversation {
        store
            .get_or_create(UserId::new(), TenantId::new(), InstanceId::new(), None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_or_create_returns_existing() {
        let store = store();
        let conversation = new_conversation(&store).await;

        let again = store
            .get_or_create(
                conversation.user_id,
                conversation.tenant_id,
                conversation.instance_id,
                Some(conversation.id),
            )
            .await
            .unwrap();
        assert_eq!(again.id, conversation.id);
    }

    #[tokio::test]
    async fn test_tenant_mismatch_rejected_without_content() {
        let store = store();
        let conversation = new_conversation(&store).await;
        store
            .append(
                &conversation,
                MessageDraft::new(MessageRole::User, "private"),
            )
            .await
            .unwrap();

        let other_tenant = TenantId::new();
        let err = store
            .get_or_create(
                conversation.user_id,
                other_tenant,
                conversation.instance_id,
                Some(conversation.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::TenantMismatch { .. }));

        // No write happened under the wrong tenant either.
        let history = store
            .history(
                conversation.tenant_id,
                conversation.user_id,
                conversation.id,
                0,
                10,
            )
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_conversation_not_found() {
        let store = store();
        let err = store
            .get_or_create(
                UserId::new(),
                TenantId::new(),
                InstanceId::new(),
                Some(ConversationId::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn test_sequence_numbers_gap_free() {
        let store = store();
        let conversation = new_conversation(&store).await;

        for i in 0..5 {
            let message = store
                .append(
                    &conversation,
                    MessageDraft::new(MessageRole::User, format!("msg {}", i)),
                )
                .await
                .unwrap();
            assert_eq!(message.seq, i + 1);
        }
    }

    #[tokio::test]
    async fn test_concurrent_appends_serialize_per_conversation() {
        let store = Arc::new(store());
        let conversation = new_conversation(&store).await;

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            let conversation = conversation.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        &conversation,
                        MessageDraft::new(MessageRole::User, format!("msg {}", i)),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut seqs: Vec<u64> = Vec::new();
        for handle in handles {
            seqs.push(handle.await.unwrap().seq);
        }
        seqs.sort_unstable();
        let expected: Vec<u64> = (1..=32).collect();
        assert_eq!(seqs, expected);
    }

    #[tokio::test]
    async fn test_append_replay_is_idempotent() {
        let store = store();
        let conversation = new_conversation(&store).await;

        let draft = MessageDraft::new(MessageRole::Assistant, "reply");
        let first = store.append(&conversation, draft.clone()).await.unwrap();
        let second = store.append(&conversation, draft).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.seq, second.seq);
        let history = store
            .history(
                conversation.tenant_id,
                conversation.user_id,
                conversation.id,
                0,
                10,
            )
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_context_window_oldest_first() {
        let store = store();
        let conversation = new_conversation(&store).await;
        for i in 0..6 {
            store
                .append(
                    &conversation,
                    MessageDraft::new(MessageRole::User, format!("msg {}", i)),
                )
                .await
                .unwrap();
        }

        let context = store.context(&conversation, 3).await.unwrap();
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].content, "msg 3");
        assert_eq!(context[2].content, "msg 5");
        assert!(context.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let store = store();
        let conversation = new_conversation(&store).await;
        for i in 0..10 {
            store
                .append(
                    &conversation,
                    MessageDraft::new(MessageRole::User, format!("msg {}", i)),
                )
                .await
                .unwrap();
        }

        let page = store
            .history(
                conversation.tenant_id,
                conversation.user_id,
                conversation.id,
                4,
                3,
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].content, "msg 4");
    }

    #[tokio::test]
    async fn test_history_hides_other_users_conversations() {
        let store = store();
        let conversation = new_conversation(&store).await;

        let err = store
            .history(conversation.tenant_id, UserId::new(), conversation.id, 0, 10)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound(_)));
    }

    #[tokio::test]
    async fn test_feedback_requires_existing_message() {
        let store = store();
        let conversation = new_conversation(&store).await;
        let message = store
            .append(&conversation, MessageDraft::new(MessageRole::Assistant, "hi"))
            .await
            .unwrap();

        let ok = store
            .add_feedback(
                conversation.tenant_id,
                conversation.id,
                Feedback {
                    message_id: message.id,
                    user_id: conversation.user_id,
                    rating: 5,
                    comment: Some("helpful".into()),
                    created_at: Utc::now(),
                },
            )
            .await;
        assert!(ok.is_ok());

        let missing = store
            .add_feedback(
                conversation.tenant_id,
                conversation.id,
                Feedback {
                    message_id: crate::core::types::MessageId::new(),
                    user_id: conversation.user_id,
                    rating: 1,
                    comment: None,
                    created_at: Utc::now(),
                },
            )
            .await;
        assert!(matches!(missing, Err(ChatError::MessageNotFound(_))));
    }
}
