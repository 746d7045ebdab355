//! Model invocation gateway
//!
//! Abstraction over interchangeable AI backends with retry against the
//! primary and a single fallback attempt.

mod backend;
mod gateway;
mod hosted;
mod local;
mod retry;

pub use backend::{BackendError, BackendResponse, ChatBackend};
pub use gateway::{InvocationOutcome, InvocationRecord, ModelGateway};
pub use hosted::HostedApiBackend;
pub use local::LocalInferenceBackend;
pub use retry::{run_with_retry, RetryPolicy};

use std::sync::Arc;

use crate::config::{BackendConfig, BackendKind};
use crate::utils::error::Result;

/// Construct backends from configuration, preserving preference order
pub fn build_backends(configs: &[BackendConfig]) -> Result<Vec<Arc<dyn ChatBackend>>> {
    configs
        .iter()
        .map(|config| {
            Ok(match config.kind {
                BackendKind::HostedApi => {
                    Arc::new(HostedApiBackend::new(config)?) as Arc<dyn ChatBackend>
                }
                BackendKind::LocalInference => {
                    Arc::new(LocalInferenceBackend::new(config)?) as Arc<dyn ChatBackend>
                }
            })
        })
        .collect()
}
