//! # ChatGuard
//!
//! Message-processing pipeline for a multi-tenant chatbot platform.
//!
//! Every inbound message passes through rate limiting, configurable
//! regex filtering, external moderation, and PII masking before it
//! reaches a model backend; the reply is masked again and persisted in
//! tenant-isolated conversation storage. The [`ChatOrchestrator`] drives
//! the whole sequence and is the main entry point.
//!
//! ## Components
//!
//! - [`core::filter`]: hot-reloadable block/sanitize rule engine
//! - [`core::moderation`]: single-shot external moderation client
//! - [`core::redaction`]: pattern and entity based PII masking
//! - [`core::store`]: tenant-scoped conversation persistence
//! - [`core::gateway`]: model backends with retry and fallback
//! - [`core::rate_limiter`]: sliding-window per-user limiting
//! - [`core::orchestrator`]: the pipeline state machine
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatguard::config::FilterConfigFile;
//! use chatguard::core::filter::ContentFilterEngine;
//! use chatguard::core::redaction::PIIRedactor;
//! use chatguard::core::store::MemoryConversationStore;
//! use chatguard::monitoring::NoopAuditSink;
//!
//! # fn main() -> chatguard::Result<()> {
//! let audit = Arc::new(NoopAuditSink);
//! let filter_config = FilterConfigFile::default();
//! let filter = Arc::new(ContentFilterEngine::new(&filter_config, audit.clone())?);
//! let redactor = Arc::new(PIIRedactor::new(audit.clone()));
//! let store = Arc::new(MemoryConversationStore::new(audit.clone()));
//! # let _ = (filter, redactor, store);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod monitoring;
pub mod utils;

pub use config::PipelineConfig;
pub use core::orchestrator::{ChatOrchestrator, PipelineState};
pub use core::types::{
    ChatRequest, ChatResponse, Conversation, ConversationId, Feedback, InstanceId, Message,
    MessageId, MessageRole, RequestIdentity, TenantId, UserId,
};
pub use utils::error::{ChatError, Result};
