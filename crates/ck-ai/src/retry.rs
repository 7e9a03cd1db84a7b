//! Retry with exponential backoff for rate-limited upstream calls.
//!
//! Only failures that report themselves as rate limits are retried. Every
//! other failure is returned on first occurrence.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::UpstreamError;
use crate::metrics::record_retry;

/// Classifies an error as an upstream rate limit.
pub trait RateLimitSignal {
    fn is_rate_limited(&self) -> bool;
}

impl RateLimitSignal for UpstreamError {
    fn is_rate_limited(&self) -> bool {
        UpstreamError::is_rate_limited(self)
    }
}

/// Backoff policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Upper bound on the total time spent sleeping.
    pub fn max_total_delay(&self) -> Duration {
        (0..self.retries)
            .map(|n| self.initial_delay.saturating_mul(2u32.saturating_pow(n)))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Run `call`, retrying rate-limited failures with doubling delays.
///
/// # Example
/// ```ignore
/// let policy = RetryPolicy::default();
/// let text = retry_with_backoff(&policy, || client.complete(&request)).await?;
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, call: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RateLimitSignal + std::fmt::Display,
{
    let mut remaining = policy.retries;
    let mut delay = policy.initial_delay;

    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() && remaining > 0 => {
                warn!(
                    delay_ms = delay.as_millis() as u64,
                    remaining,
                    "Rate limited, retrying: {}", e
                );
                record_retry();
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                remaining -= 1;
            }
            Err(e) => return Err(e),
        }
    }
}
