//! Chat pipeline orchestrator
//!
//! Drives one request through the full pipeline: rate limit, filter,
//! moderation, PII masking, context retrieval, model invocation, and
//! persistence. The orchestrator owns the cross-cutting decisions the
//! individual components stay out of: strict-mode handling for an
//! unavailable moderation service, recovery of blocked input into a
//! user-facing response, and stashing a generated reply whose persistence
//! failed so the caller can redeliver it.

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::core::filter::{ContentFilterEngine, FilterAction};
use crate::core::gateway::ModelGateway;
use crate::core::moderation::{ModerationClient, ModerationVerdict};
use crate::core::rate_limiter::RateLimiter;
use crate::core::redaction::PIIRedactor;
use crate::core::store::ConversationStore;
use crate::core::types::{
    ChatRequest, ChatResponse, Conversation, ConversationId, Feedback, Message, MessageDraft,
    MessageId, MessageRole, RequestIdentity, ResponseMetadata,
};
use crate::monitoring::{AuditSink, MetricsSink};
use crate::utils::error::{ChatError, Result};

use super::state::PipelineState;

/// Reply returned to moderation-flagged input
const MODERATION_BLOCK_MESSAGE: &str =
    "🚫 Your input was flagged as inappropriate by our moderation system.";

/// A generated reply whose persistence failed
///
/// Kept keyed by the reply's message id; redelivery replays the drafts,
/// which the store deduplicates by id.
#[derive(Debug, Clone)]
struct PendingReply {
    conversation: Conversation,
    /// Present when the user message itself was never stored
    user_draft: Option<MessageDraft>,
    assistant_draft: MessageDraft,
}

/// Orchestrates the message-processing pipeline
pub struct ChatOrchestrator {
    config: PipelineConfig,
    filter: Arc<ContentFilterEngine>,
    moderation: ModerationClient,
    redactor: Arc<PIIRedactor>,
    store: Arc<dyn ConversationStore>,
    gateway: Arc<ModelGateway>,
    rate_limiter: RateLimiter,
    audit: Arc<dyn AuditSink>,
    metrics: Arc<dyn MetricsSink>,
    pending: DashMap<MessageId, PendingReply>,
}

impl ChatOrchestrator {
    pub fn new(
        config: PipelineConfig,
        filter: Arc<ContentFilterEngine>,
        redactor: Arc<PIIRedactor>,
        store: Arc<dyn ConversationStore>,
        gateway: Arc<ModelGateway>,
        audit: Arc<dyn AuditSink>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Result<Self> {
        let moderation = ModerationClient::new(&config.moderation)?;
        let rate_limiter = RateLimiter::new(config.rate_limit.clone());
        Ok(Self {
            config,
            filter,
            moderation,
            redactor,
            store,
            gateway,
            rate_limiter,
            audit,
            metrics,
            pending: DashMap::new(),
        })
    }

    /// Process one chat message end to end
    ///
    /// Blocked input is not an error: it resolves to a `ChatResponse`
    /// carrying the block reason with `filter_block` set. Errors are
    /// reserved for conditions the caller must handle differently, such as
    /// tenant mismatches, rate limits, and dependency failures.
    pub async fn process(
        &self,
        identity: RequestIdentity,
        request: ChatRequest,
    ) -> Result<ChatResponse> {
        let started = Instant::now();
        let mut state = PipelineState::Received;
        self.metrics.incr_counter("chat.requests", 1);

        let key = format!("{}:{}", identity.tenant_id, identity.user_id);
        let decision = self.rate_limiter.check_and_record(&key);
        if !decision.allowed {
            self.metrics.incr_counter("chat.rate_limited", 1);
            return Err(ChatError::RateLimited(format!(
                "{} requests in the last minute, limit is {}",
                decision.current, decision.limit
            )));
        }

        let outcome = match self.filter.apply(&request.message) {
            Ok(outcome) => outcome,
            Err(ChatError::Validation(reason)) => {
                self.advance(&mut state, PipelineState::Blocked);
                self.metrics.incr_counter("chat.blocked", 1);
                return Ok(self.blocked_response(request.conversation_id, reason));
            }
            Err(e) => return Err(e),
        };
        self.advance(&mut state, PipelineState::LengthChecked);
        self.advance(&mut state, PipelineState::RegexFiltered);

        if !outcome.is_allowed() {
            self.advance(&mut state, PipelineState::Blocked);
            self.metrics.incr_counter("chat.blocked", 1);
            let reason = outcome
                .message
                .unwrap_or_else(|| "Your message was blocked by content policy.".into());
            return Ok(self.blocked_response(request.conversation_id, reason));
        }

        let sanitize_warning = match outcome.action {
            FilterAction::Sanitize => outcome.message,
            _ => None,
        };
        let text = outcome.sanitized_text;

        if self.config.moderation.enabled {
            match self.moderation.check(&text).await {
                ModerationVerdict::Clear => {}
                ModerationVerdict::Flagged { categories } => {
                    info!(?categories, "message flagged by moderation");
                    self.audit
                        .emit("moderation_flagged", json!({ "categories": categories }));
                    self.advance(&mut state, PipelineState::Blocked);
                    self.metrics.incr_counter("chat.moderation_flagged", 1);
                    return Ok(self.blocked_response(
                        request.conversation_id,
                        MODERATION_BLOCK_MESSAGE.to_string(),
                    ));
                }
                ModerationVerdict::Unavailable { reason } => {
                    if self.config.moderation.strict_mode {
                        self.advance(&mut state, PipelineState::ServiceError);
                        return Err(ChatError::Moderation(reason));
                    }
                    warn!(reason = %reason, "moderation unavailable, continuing without it");
                }
            }
        }
        self.advance(&mut state, PipelineState::Moderated);

        let user_content = self.redactor.redact(&text).await.masked_text;
        self.advance(&mut state, PipelineState::PiiMasked);

        let conversation = self
            .store
            .get_or_create(
                identity.user_id,
                identity.tenant_id,
                request.chatbot_instance_id,
                request.conversation_id,
            )
            .await?;
        let context = self
            .store
            .context(&conversation, self.config.context_window)
            .await?;
        self.advance(&mut state, PipelineState::ContextBuilt);

        let backend_response = match self.gateway.invoke(&user_content, &context, None).await {
            Ok(response) => response,
            Err(e) => {
                self.advance(&mut state, PipelineState::ServiceError);
                self.metrics.incr_counter("chat.model_failures", 1);
                return Err(e);
            }
        };
        self.advance(&mut state, PipelineState::ModelInvoked);

        // The model reply passes through the same redaction as user input;
        // PII echoed back from context must not reach the client.
        let assistant_content = self.redactor.redact(&backend_response.content).await.masked_text;

        let mut user_draft = MessageDraft::new(MessageRole::User, user_content);
        if let Some(warning) = &sanitize_warning {
            user_draft = user_draft.with_metadata(json!({ "sanitization_warning": warning }));
        }
        let assistant_draft = MessageDraft::new(MessageRole::Assistant, assistant_content)
            .with_metadata(json!({
                "model_used": backend_response.model_used,
                "tokens_used": backend_response.tokens_used,
            }));

        let assistant = match self
            .persist_turn(&conversation, user_draft, assistant_draft)
            .await
        {
            Ok(message) => message,
            Err(e) => {
                self.advance(&mut state, PipelineState::ServiceError);
                return Err(e);
            }
        };
        self.advance(&mut state, PipelineState::Persisted);

        self.metrics.record_latency("chat.pipeline", started.elapsed());
        self.advance(&mut state, PipelineState::Responded);
        Ok(ChatResponse {
            message_id: assistant.id,
            conversation_id: Some(conversation.id),
            content: assistant.content,
            role: MessageRole::Assistant,
            timestamp: assistant.created_at,
            metadata: ResponseMetadata {
                filter_block: None,
                sanitization_warning: sanitize_warning,
            },
        })
    }

    /// Replay persistence of a reply stashed by a failed `process` call
    ///
    /// The drafts keep their original ids, so a partially persisted turn is
    /// completed rather than duplicated.
    pub async fn redeliver(
        &self,
        identity: RequestIdentity,
        message_id: MessageId,
    ) -> Result<ChatResponse> {
        let pending = self
            .pending
            .get(&message_id)
            .map(|entry| entry.clone())
            .ok_or(ChatError::MessageNotFound(message_id))?;

        if pending.conversation.tenant_id != identity.tenant_id {
            return Err(ChatError::TenantMismatch {
                conversation_id: pending.conversation.id,
                tenant_id: identity.tenant_id,
            });
        }

        if let Some(user_draft) = &pending.user_draft {
            self.append_with_retry(&pending.conversation, user_draft)
                .await
                .map_err(|e| self.persistence_error(message_id, e))?;
        }
        let assistant = self
            .append_with_retry(&pending.conversation, &pending.assistant_draft)
            .await
            .map_err(|e| self.persistence_error(message_id, e))?;

        self.pending.remove(&message_id);
        info!(%message_id, "pending reply redelivered");
        Ok(ChatResponse {
            message_id: assistant.id,
            conversation_id: Some(pending.conversation.id),
            content: assistant.content,
            role: MessageRole::Assistant,
            timestamp: assistant.created_at,
            metadata: ResponseMetadata::default(),
        })
    }

    /// Paginated message history for an owned conversation
    pub async fn history(
        &self,
        identity: RequestIdentity,
        conversation_id: ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.store
            .history(
                identity.tenant_id,
                identity.user_id,
                conversation_id,
                offset,
                limit,
            )
            .await
    }

    /// Record user feedback on an assistant message
    pub async fn submit_feedback(
        &self,
        identity: RequestIdentity,
        conversation_id: ConversationId,
        message_id: MessageId,
        rating: u8,
        comment: Option<String>,
    ) -> Result<Feedback> {
        if !(1..=5).contains(&rating) {
            return Err(ChatError::Validation(
                "rating must be between 1 and 5".into(),
            ));
        }
        let feedback = Feedback {
            message_id,
            user_id: identity.user_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        self.store
            .add_feedback(identity.tenant_id, conversation_id, feedback)
            .await
    }

    /// Number of replies awaiting redelivery
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn advance(&self, state: &mut PipelineState, next: PipelineState) {
        debug!(from = %state, to = %next, "pipeline transition");
        *state = next;
    }

    fn blocked_response(
        &self,
        conversation_id: Option<ConversationId>,
        reason: String,
    ) -> ChatResponse {
        ChatResponse {
            message_id: MessageId::new(),
            conversation_id,
            content: reason,
            role: MessageRole::Assistant,
            timestamp: Utc::now(),
            metadata: ResponseMetadata {
                filter_block: Some(true),
                sanitization_warning: None,
            },
        }
    }

    fn persistence_error(&self, message_id: MessageId, cause: ChatError) -> ChatError {
        ChatError::Persistence {
            message_id: Some(message_id),
            reason: cause.to_string(),
        }
    }

    async fn append_with_retry(
        &self,
        conversation: &Conversation,
        draft: &MessageDraft,
    ) -> Result<Message> {
        match self.store.append(conversation, draft.clone()).await {
            Ok(message) => Ok(message),
            Err(first) => {
                warn!(error = %first, "message append failed, retrying once");
                self.store.append(conversation, draft.clone()).await
            }
        }
    }

    /// Persist the user message then the reply, each retried once
    ///
    /// On final failure the drafts are stashed for redelivery and the error
    /// carries the reply's message id.
    async fn persist_turn(
        &self,
        conversation: &Conversation,
        user_draft: MessageDraft,
        assistant_draft: MessageDraft,
    ) -> Result<Message> {
        let reply_id = assistant_draft.id;

        if let Err(e) = self.append_with_retry(conversation, &user_draft).await {
            self.stash_pending(conversation, Some(user_draft), assistant_draft);
            return Err(self.persistence_error(reply_id, e));
        }
        match self.append_with_retry(conversation, &assistant_draft).await {
            Ok(message) => Ok(message),
            Err(e) => {
                self.stash_pending(conversation, None, assistant_draft);
                Err(self.persistence_error(reply_id, e))
            }
        }
    }

    fn stash_pending(
        &self,
        conversation: &Conversation,
        user_draft: Option<MessageDraft>,
        assistant_draft: MessageDraft,
    ) {
        let reply_id = assistant_draft.id;
        warn!(message_id = %reply_id, "stashing generated reply for redelivery");
        self.audit.emit(
            "reply_pending",
            json!({
                "message_id": reply_id,
                "conversation_id": conversation.id,
            }),
        );
        self.metrics.incr_counter("chat.pending_replies", 1);
        self.pending.insert(
            reply_id,
            PendingReply {
                conversation: conversation.clone(),
                user_draft,
                assistant_draft,
            },
        );
    }
}
