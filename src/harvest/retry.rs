//! Bounded retry around a single remote call.
//!
//! Every attempt runs under a timeout. Errors are classified with
//! [`IsRetryable`]: transient failures are retried after a backoff delay,
//! permanent ones return immediately.

use std::future::Future;
use std::time::Duration;

use crate::executor::RateLimiter;
use crate::traits::FetchError;

/// Classifies an error as transient (worth another attempt) or permanent.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Api { code, .. } => code == "maxlag" || code == "ratelimited",
            FetchError::Timeout { .. } => true,
            // malformed payloads and local disk errors will not improve on retry
            FetchError::Decode(_) | FetchError::EmptyBody { .. } | FetchError::Io(_) => false,
        }
    }
}

/// Retry schedule for remote calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (minimum 1)
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay: Duration,

    /// Growth factor applied to the delay after each retry (1.0 = fixed)
    pub backoff_multiplier: f64,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Deadline for one attempt
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 1.0,
            max_delay: Duration::from_secs(30),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no delay. Useful in tests and for one-shot calls.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            ..Self::default()
        }
    }

    pub fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy's
/// attempts are used up. Returns the last error in the failure cases.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    run_attempts(policy, None, operation_name, operation).await
}

/// Like [`with_retry`], but every attempt first waits for a slot on
/// `limiter`. The wait is not part of the attempt's timeout.
pub async fn with_paced_retry<F, Fut, T>(
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    operation_name: &str,
    operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    run_attempts(policy, Some(limiter), operation_name, operation).await
}

async fn run_attempts<F, Fut, T>(
    policy: &RetryPolicy,
    limiter: Option<&RateLimiter>,
    operation_name: &str,
    mut operation: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    let mut delay = policy.initial_delay;

    loop {
        if let Some(limiter) = limiter {
            limiter.acquire().await;
        }
        let outcome = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                after: policy.attempt_timeout,
            }),
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(
                        operation = operation_name,
                        attempts = attempt,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;

                attempt += 1;
                delay = Duration::from_secs_f64(delay.as_secs_f64() * policy.backoff_multiplier)
                    .min(policy.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        operation = operation_name,
                        attempts = attempt,
                        "Retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}
