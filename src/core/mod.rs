//! Core pipeline components

pub mod filter;
pub mod gateway;
pub mod moderation;
pub mod orchestrator;
pub mod rate_limiter;
pub mod redaction;
pub mod store;
pub mod types;
