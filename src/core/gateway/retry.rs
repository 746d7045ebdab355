//! Retry loop with exponential backoff
//!
//! A generic loop parameterized by attempt count and backoff; backend
//! calls return `Result` and the loop inspects them, so no control flow
//! crosses the gateway boundary through panics or exceptions.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use super::backend::BackendError;

/// Retry settings: attempt budget plus backoff base
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts against the primary backend
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `base * 2^n` plus jitter
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Backoff delay before retrying after attempt `attempt` (zero-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        let scaled = base_ms.saturating_mul(2u64.saturating_pow(attempt));
        // Cap so a misconfigured base cannot stall the pipeline.
        let capped = scaled.min(30_000);
        let jitter = if capped == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=capped / 2)
        };
        Duration::from_millis(capped + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl From<&crate::config::GatewaySettings> for RetryPolicy {
    fn from(settings: &crate::config::GatewaySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
        }
    }
}

/// Run `op` up to `policy.max_retries` times with backoff between attempts
///
/// Returns the final result and the number of attempts actually made.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut op: F,
) -> (std::result::Result<T, BackendError>, u32)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, BackendError>>,
{
    let mut attempts = 0;
    loop {
        let result = op(attempts).await;
        attempts += 1;

        match result {
            Ok(value) => return (Ok(value), attempts),
            Err(error) => {
                if attempts >= policy.max_retries {
                    return (Err(error), attempts);
                }
                let delay = policy.delay_for(attempts - 1);
                debug!(
                    attempt = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "backend attempt failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
