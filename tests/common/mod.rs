//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chatguard::config::{FilterConfigFile, PipelineConfig};
use chatguard::core::filter::ContentFilterEngine;
use chatguard::core::gateway::{
    BackendError, BackendResponse, ChatBackend, ModelGateway, RetryPolicy,
};
use chatguard::core::redaction::PIIRedactor;
use chatguard::core::store::{ConversationStore, MemoryConversationStore};
use chatguard::core::types::{
    Conversation, ConversationId, Feedback, InstanceId, Message, MessageDraft, TenantId, UserId,
};
use chatguard::monitoring::{AuditSink, NoopAuditSink, TracingMetricsSink};
use chatguard::{ChatError, ChatOrchestrator, Result};

/// Audit sink that records every event for assertions
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingAuditSink {
    pub fn event_names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(n, _)| n.clone()).collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        self.events.lock().push((event_type.to_string(), payload));
    }
}

/// Backend that returns a fixed reply and records what it was asked
pub struct ScriptedBackend {
    name: String,
    reply: String,
    fail: bool,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
    contexts: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedBackend {
    pub fn new(name: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            reply: reply.into(),
            fail: false,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            reply: String::new(),
            fail: true,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
            contexts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn contexts(&self) -> Vec<Vec<Message>> {
        self.contexts.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> std::result::Result<BackendResponse, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        self.contexts.lock().push(context.to_vec());
        if self.fail {
            return Err(BackendError::Network {
                backend: self.name.clone(),
                message: "scripted failure".into(),
            });
        }
        Ok(BackendResponse {
            content: self.reply.clone(),
            model_used: self.name.clone(),
            tokens_used: Some(42),
        })
    }
}

/// Store wrapper that fails a fixed number of appends before recovering
pub struct FlakyStore {
    inner: MemoryConversationStore,
    append_failures: AtomicU32,
}

impl FlakyStore {
    pub fn failing_appends(failures: u32) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryConversationStore::new(Arc::new(NoopAuditSink)),
            append_failures: AtomicU32::new(failures),
        })
    }
}

#[async_trait]
impl ConversationStore for FlakyStore {
    async fn get_or_create(
        &self,
        user_id: UserId,
        tenant_id: TenantId,
        instance_id: InstanceId,
        conversation_id: Option<ConversationId>,
    ) -> Result<Conversation> {
        self.inner
            .get_or_create(user_id, tenant_id, instance_id, conversation_id)
            .await
    }

    async fn append(&self, conversation: &Conversation, draft: MessageDraft) -> Result<Message> {
        let remaining = self.append_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.append_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(ChatError::Persistence {
                message_id: Some(draft.id),
                reason: "injected append failure".into(),
            });
        }
        self.inner.append(conversation, draft).await
    }

    async fn context(&self, conversation: &Conversation, window: usize) -> Result<Vec<Message>> {
        self.inner.context(conversation, window).await
    }

    async fn history(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
        conversation_id: ConversationId,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Message>> {
        self.inner
            .history(tenant_id, user_id, conversation_id, offset, limit)
            .await
    }

    async fn add_feedback(
        &self,
        tenant_id: TenantId,
        conversation_id: ConversationId,
        feedback: Feedback,
    ) -> Result<Feedback> {
        self.inner
            .add_feedback(tenant_id, conversation_id, feedback)
            .await
    }
}

/// Filter configuration used by the pipeline scenarios
pub fn test_filter_config() -> FilterConfigFile {
    serde_json::from_value(json!({
        "regex_filters": [
            {
                "name": "prompt_injection",
                "pattern": "ignore\\s+previous\\s+instructions",
                "action": "block",
                "message": "Your message contains content that is not allowed."
            },
            {
                "name": "profanity",
                "pattern": "\\bdamn\\b",
                "action": "sanitize",
                "message": "Some words in your message were replaced.",
                "replacement": "***"
            }
        ],
        "settings": {
            "case_sensitive": false,
            "max_message_length": 4096,
            "enable_logging": true
        }
    }))
    .unwrap()
}

/// Pipeline configuration with external dependencies switched off
pub fn test_pipeline_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.moderation.enabled = false;
    config.rate_limit.enabled = false;
    config
}

/// Assemble an orchestrator from explicit parts
pub fn build_orchestrator(
    config: PipelineConfig,
    filter_config: FilterConfigFile,
    store: Arc<dyn ConversationStore>,
    backends: Vec<Arc<dyn ChatBackend>>,
) -> ChatOrchestrator {
    let audit: Arc<dyn AuditSink> = Arc::new(NoopAuditSink);
    let filter = Arc::new(ContentFilterEngine::new(&filter_config, audit.clone()).unwrap());
    let redactor = Arc::new(PIIRedactor::new(audit.clone()));
    let gateway = Arc::new(
        ModelGateway::new(
            backends,
            RetryPolicy::new(config.gateway.max_retries, Duration::from_millis(1)),
            audit.clone(),
        )
        .unwrap(),
    );
    ChatOrchestrator::new(
        config,
        filter,
        redactor,
        store,
        gateway,
        audit,
        Arc::new(TracingMetricsSink),
    )
    .unwrap()
}

/// Orchestrator over a memory store and one scripted backend
pub fn simple_orchestrator(backend: Arc<ScriptedBackend>) -> ChatOrchestrator {
    let store = Arc::new(MemoryConversationStore::new(Arc::new(NoopAuditSink)));
    build_orchestrator(
        test_pipeline_config(),
        test_filter_config(),
        store,
        vec![backend as Arc<dyn ChatBackend>],
    )
}
