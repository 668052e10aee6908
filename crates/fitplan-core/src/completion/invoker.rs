//! Bounded retry around a [`CompletionService`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use super::error::CompletionError;
use super::trait_def::CompletionService;
use super::types::{CompletionRequest, CompletionSettings};

/// Retry budget and backoff curve for transient completion failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. Zero means exactly one attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_millis(8000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): doubles each time, capped
    /// at `max_backoff`, plus up to 25% random jitter.
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let base = self.base_backoff(retry);
        let jitter_ms = (base.as_millis() as u64) / 4;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }

    fn base_backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// The completion service failed for good.
#[derive(Debug, Error)]
#[error("{source} (after {attempts} attempt(s))")]
pub struct InvokeError {
    pub attempts: u32,
    #[source]
    pub source: CompletionError,
}

/// Calls a completion service with a timeout per attempt and retries
/// transient failures with exponential backoff.
pub struct CompletionInvoker {
    service: Arc<dyn CompletionService>,
    settings: CompletionSettings,
    policy: RetryPolicy,
    timeout: Duration,
}

impl fmt::Debug for CompletionInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionInvoker")
            .field("service", &self.service.name())
            .field("settings", &self.settings)
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CompletionInvoker {
    pub fn new(
        service: Arc<dyn CompletionService>,
        settings: CompletionSettings,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            settings,
            policy,
            timeout,
        }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    /// Send `system_prompt` and return the generated text.
    ///
    /// Non-retryable failures return immediately. Retryable ones are retried
    /// up to the policy's budget, then returned with the attempt count.
    pub async fn invoke(&self, system_prompt: &str) -> Result<String, InvokeError> {
        let request = CompletionRequest::new(&self.settings, system_prompt);
        let max_attempts = self.policy.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            let outcome = tokio::time::timeout(self.timeout, self.service.complete(&request))
                .await
                .unwrap_or(Err(CompletionError::Timeout(self.timeout)));

            match outcome {
                Ok(text) => {
                    debug!(service = self.service.name(), attempt, chars = text.len(), "completion succeeded");
                    return Ok(text);
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        service = self.service.name(),
                        attempt,
                        max_attempts,
                        backoff_ms = delay.as_millis() as u64,
                        error = %e,
                        "completion failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!(service = self.service.name(), attempt, error = %e, "completion failed");
                    return Err(InvokeError {
                        attempts: attempt,
                        source: e,
                    });
                }
            }
        }
    }
}
