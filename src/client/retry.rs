//! Bounded exponential backoff around a single logical request.

use crate::client::classifier::ErrorClassifier;
use crate::client::transport::{ApiRequest, ApiResponse, Transport};
use crate::config::Config;
use crate::error::{CrmApiError, CrmResult, ErrorKind, TransportError};
use crate::metrics::{HttpTimer, Metrics};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per logical request, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            attempt_timeout: Duration::from_secs(config.request_timeout),
        }
    }

    /// Delay before the retry that follows attempt `attempt` (1-indexed):
    /// `base_delay * 2^(attempt - 1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let multiplier = 2_u64.saturating_pow(exponent);
        let millis = (self.base_delay.as_millis() as u64).saturating_mul(multiplier);
        Duration::from_millis(millis)
    }
}

/// Progress of one logical request; dropped on success or exhaustion.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub last_error: Option<CrmApiError>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 0,
            max_attempts: policy.max_attempts,
            base_delay: policy.base_delay,
            last_error: None,
        }
    }

    pub fn should_retry(&self) -> bool {
        self.attempt < self.max_attempts
            && self
                .last_error
                .as_ref()
                .is_some_and(|e| e.kind.is_retryable())
    }

    fn into_error(self) -> CrmApiError {
        self.last_error.unwrap_or_else(|| {
            CrmApiError::new(ErrorKind::Unknown, None, "Request failed without an error")
        })
    }
}

/// Runs requests through a [`Transport`], retrying `RateLimited` and
/// `TransientServerError` outcomes with exponential backoff.
pub struct RetryEngine {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    metrics: Metrics,
}

impl RetryEngine {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            metrics: Metrics::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Execute a request, returning the first 2xx response or the last
    /// classified error.
    pub async fn execute(&self, request: &ApiRequest) -> CrmResult<ApiResponse> {
        let mut state = RetryState::new(&self.policy);

        loop {
            state.attempt += 1;
            let timer = HttpTimer::new(self.metrics.clone());

            let outcome =
                match tokio::time::timeout(self.policy.attempt_timeout, self.transport.send(request))
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransportError::Timeout),
                };

            let error = match ErrorClassifier::classify(outcome) {
                Ok(response) => {
                    timer.complete();
                    if state.attempt > 1 {
                        debug!("{} succeeded on attempt {}", request, state.attempt);
                    }
                    return Ok(response);
                }
                Err(error) => {
                    timer.complete_with_error();
                    error
                }
            };

            if error.kind == ErrorKind::RateLimited {
                self.metrics.record_rate_limited();
            }
            state.last_error = Some(error);

            if !state.should_retry() {
                let error = state.into_error();
                if error.kind.is_retryable() {
                    warn!(
                        attempts = self.policy.max_attempts,
                        "{} failed after all attempts: {}", request, error
                    );
                } else {
                    debug!("{} failed: {}", request, error);
                }
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(state.attempt);
            warn!(
                attempt = state.attempt,
                max_attempts = state.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Retrying {} after {}",
                request,
                state
                    .last_error
                    .as_ref()
                    .map(|e| e.kind)
                    .unwrap_or(ErrorKind::Unknown)
            );
            self.metrics.record_retry();
            tokio::time::sleep(delay).await;
        }
    }
}
