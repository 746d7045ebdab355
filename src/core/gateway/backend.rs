//! Backend capability seam
//!
//! Every model backend implements `ChatBackend::generate`; the gateway
//! holds an ordered list of trait objects rather than switching on a type.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::Message;

/// Errors a backend call can produce
#[derive(Error, Debug)]
pub enum BackendError {
    /// Request exceeded the backend's timeout
    #[error("backend '{backend}' timed out: {message}")]
    Timeout { backend: String, message: String },

    /// The backend returned a non-success status
    #[error("backend '{backend}' returned status {status}: {message}")]
    Api {
        backend: String,
        status: u16,
        message: String,
    },

    /// Transport-level failure
    #[error("backend '{backend}' network error: {message}")]
    Network { backend: String, message: String },

    /// The response body did not match the expected shape
    #[error("backend '{backend}' invalid response: {message}")]
    InvalidResponse { backend: String, message: String },
}

impl BackendError {
    /// Classify a `reqwest` error for a named backend
    pub fn from_reqwest(backend: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            BackendError::Timeout {
                backend: backend.to_string(),
                message: error.to_string(),
            }
        } else if error.is_decode() {
            BackendError::InvalidResponse {
                backend: backend.to_string(),
                message: error.to_string(),
            }
        } else {
            BackendError::Network {
                backend: backend.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// A generated reply from one backend
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub content: String,
    pub model_used: String,
    pub tokens_used: Option<u32>,
}

/// Capability interface implemented by every interchangeable backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Stable backend name used in preference lists and audit records
    fn name(&self) -> &str;

    /// Generate a reply to `prompt` given the prior conversation turns
    async fn generate(
        &self,
        prompt: &str,
        context: &[Message],
    ) -> Result<BackendResponse, BackendError>;
}
