//! Exponential-backoff retry executor (C3).
//!
//! Mirrors the teacher's `infrastructure::claude::retry::RetryPolicy`
//! doubling-with-cap backoff, generalized with an explicit
//! `retry_on: Fn(&CoreError) -> bool` predicate instead of a
//! downcast-and-match on one error enum. Never applied to policy denials
//! (a `CoreError::RateLimited`/`ConcurrencySkip` is terminal by
//! definition) or to non-idempotent mutations — comments and merges are
//! already covered by [`crate::infrastructure::rate_limiter::RateLimiter`]'s
//! duplicate suppression, so retrying them risks double-posting.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::domain::errors::CoreError;

/// Retry policy: max attempts plus the backoff envelope.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_secs(1), max_delay: Duration::from_secs(30) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self { max_attempts, base_delay, max_delay }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Retry `operation` while `retry_on(&err)` holds, up to `max_attempts`
    /// total tries. After exhaustion, the last error is surfaced.
    pub async fn retry<F, Fut, T>(&self, retry_on: impl Fn(&CoreError) -> bool, mut operation: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt + 1 >= self.max_attempts || !retry_on(&err) {
                        return Err(err);
                    }
                    let delay = self.backoff(attempt);
                    warn!(attempt, ?delay, error = %err, "retrying after transient failure");
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Convenience wrapper using [`CoreError::is_retryable`] as the predicate.
    pub async fn retry_idempotent<F, Fut, T>(&self, operation: F) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        self.retry(CoreError::is_retryable, operation).await
    }
}
