//! Core error types for the coordination fabric.
//!
//! Each variant corresponds to one of the error kinds named in the
//! design: policy denials, transient platform failures, terminal
//! input/auth failures, and downgrade-on-failure LLM errors. Orchestrators
//! match on [`CoreError::is_retryable`] / [`CoreError::is_terminal`]
//! rather than on individual variants wherever possible, so new variants
//! don't require touching every call site.

use thiserror::Error;

/// Aggregate error type returned by the orchestrators (C6, C9, C13) and
/// propagated up to CLI/service boundaries.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A [`crate::infrastructure::rate_limiter::RateLimiter`] denial. Never retried;
    /// the specific cap or cooldown violated is carried in the message.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Transient forge error (5xx, network failure, timeout on an
    /// idempotent read). Retried by [`crate::infrastructure::retry::RetryExecutor`].
    #[error("platform error: {0}")]
    PlatformError(String),

    /// 401/403 from the forge that is not a rate-limit signal. Terminal.
    #[error("authentication error: {0}")]
    AuthError(String),

    /// Input invariant violation (bad line range, path escape, unknown
    /// template, invalid priority, cyclic dependency, ...). Terminal.
    #[error("validation error: {0}")]
    ValidationError(String),

    /// A shell command was refused by the sandbox. Terminal.
    #[error("blocked by sandbox: {0}")]
    BlockedBySandbox(String),

    /// An external call exceeded its deadline. Retried only when the
    /// underlying operation was idempotent.
    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Any failure surfaced by the LLM port. Callers downgrade to
    /// rule-based behavior rather than propagate this further.
    #[error("llm error: {0}")]
    LlmError(String),

    /// `ReviewLock` already held, or a self-review guard tripped. Not an
    /// error in the user sense — the workflow returns `skipped`.
    #[error("concurrency skip: {0}")]
    ConcurrencySkip(String),

    /// Catch-all for repository / serialization failures that don't fit
    /// the categories above.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether [`crate::infrastructure::retry::RetryExecutor`] should retry
    /// this error, assuming the wrapped operation is idempotent.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::PlatformError(_) | Self::Timeout(_))
    }

    /// Whether this error should be surfaced to the caller/operator
    /// without retry.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthError(_) | Self::ValidationError(_) | Self::BlockedBySandbox(_)
        )
    }

    /// Whether this is a policy denial (rate limit or concurrency skip) —
    /// a first-class result for the caller, not a failure to log as an error.
    pub const fn is_denial(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::ConcurrencySkip(_))
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(std::time::Duration::from_secs(30))
        } else if let Some(status) = err.status() {
            if status.as_u16() == 401 || status.as_u16() == 403 {
                Self::AuthError(err.to_string())
            } else {
                Self::PlatformError(err.to_string())
            }
        } else {
            Self::PlatformError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::ValidationError(format!("serialization error: {err}"))
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Internal(format!("database error: {err}"))
    }
}

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_not_retryable_or_terminal() {
        let err = CoreError::RateLimited("cooldown active".into());
        assert!(!err.is_retryable());
        assert!(!err.is_terminal());
        assert!(err.is_denial());
    }

    #[test]
    fn platform_error_is_retryable() {
        let err = CoreError::PlatformError("503".into());
        assert!(err.is_retryable());
        assert!(!err.is_terminal());
    }

    #[test]
    fn validation_error_is_terminal() {
        let err = CoreError::ValidationError("end_line < start_line".into());
        assert!(err.is_terminal());
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_messages_carry_context() {
        let err = CoreError::BlockedBySandbox("sudo rm -rf /".into());
        assert_eq!(err.to_string(), "blocked by sandbox: sudo rm -rf /");
    }
}
