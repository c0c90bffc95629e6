//! Retry policy for HTTP transport
//!
//! Wraps the backoff strategy from `turbopve-core` with HTTP-specific
//! defaults and the rules for which failures may be replayed.

use crate::error::TransportError;
use http::Method;
use std::time::Duration;
pub use turbopve_core::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};

/// HTTP-specific retry policy.
///
/// # Default Configuration
///
/// - `max_retries`: 3
/// - `initial_delay`: 1s
/// - `max_delay`: 30s
/// - `multiplier`: 2.0
/// - `jitter`: 0.1
///
/// # Examples
///
/// ```rust
/// use turbopve_transport::http::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(100))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    inner: ExponentialBackoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicyBuilder::default().build()
    }
}

impl RetryPolicy {
    /// Create a new builder for configuring HTTP retry policy.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            inner: ExponentialBackoff::none(),
        }
    }

    /// Check if a transport error is transient.
    ///
    /// Retryable errors:
    /// - Timeout errors
    /// - Connection errors (network failures)
    ///
    /// Everything else, including cancellation, fails immediately.
    pub fn is_retryable(error: &TransportError) -> bool {
        match error {
            TransportError::Timeout => true,
            TransportError::Connection(_) => true,

            TransportError::Http(_) => false,
            TransportError::Io(_) => false,
            TransportError::InvalidRequest(_) => false,
            TransportError::Cancelled(_) => false,
            TransportError::Other(_) => false,
        }
    }

    /// Whether a failed request with `method` may be sent again.
    ///
    /// A connection failure means nothing reached the server, so any method
    /// may be replayed. A timeout may have happened after the server acted,
    /// so only idempotent methods are replayed.
    pub fn should_retry_error(method: &Method, error: &TransportError) -> bool {
        match error {
            TransportError::Connection(_) => true,
            TransportError::Timeout => is_idempotent(method),
            other => Self::is_retryable(other),
        }
    }

    /// Get the underlying ExponentialBackoff instance.
    pub fn inner(&self) -> &ExponentialBackoff {
        &self.inner
    }

    /// Calculate delay for a given attempt number.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        self.inner.next_delay(attempt).unwrap_or(Duration::ZERO)
    }
}

pub(crate) fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::TRACE
    )
}

impl BackoffStrategy for RetryPolicy {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self.inner.next_delay(attempt)
    }

    fn max_retries(&self) -> u32 {
        self.inner.max_retries()
    }
}

/// Builder for HTTP retry policies.
pub struct RetryPolicyBuilder {
    inner: ExponentialBackoffBuilder,
}

impl RetryPolicyBuilder {
    /// Set the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.inner = self.inner.max_retries(max_retries);
        self
    }

    /// Set the initial delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.initial_delay(delay);
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.inner = self.inner.max_delay(delay);
        self
    }

    /// Set the exponential multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.inner = self.inner.multiplier(multiplier);
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.inner = self.inner.jitter(jitter);
        self
    }

    /// Build the retry policy.
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            inner: self.inner.build(),
        }
    }
}

impl Default for RetryPolicyBuilder {
    fn default() -> Self {
        Self {
            inner: ExponentialBackoff::builder()
                .max_retries(3)
                .initial_delay(Duration::from_secs(1))
                .max_delay(Duration::from_secs(30))
                .multiplier(2.0)
                .jitter(0.1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbopve_core::cancel::Cancelled;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.inner().initial_delay(), Duration::from_secs(1));
        assert_eq!(policy.inner().max_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_is_retryable() {
        assert!(RetryPolicy::is_retryable(&TransportError::Timeout));
        assert!(RetryPolicy::is_retryable(&TransportError::Connection(
            "network error".to_string()
        )));

        assert!(!RetryPolicy::is_retryable(&TransportError::Http(
            "500".to_string()
        )));
        assert!(!RetryPolicy::is_retryable(&TransportError::Cancelled(
            Cancelled::Cancelled
        )));
        assert!(!RetryPolicy::is_retryable(&TransportError::Io(
            std::io::Error::other("io error")
        )));
    }

    #[test]
    fn test_timeouts_only_replay_idempotent_methods() {
        assert!(RetryPolicy::should_retry_error(&Method::GET, &TransportError::Timeout));
        assert!(!RetryPolicy::should_retry_error(&Method::POST, &TransportError::Timeout));
        assert!(RetryPolicy::should_retry_error(
            &Method::POST,
            &TransportError::Connection("refused".into())
        ));
    }

    #[test]
    fn test_none_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries(), 0);
        assert_eq!(policy.calculate_delay(0), Duration::ZERO);
    }

    #[test]
    fn test_calculate_delay_exponential() {
        let policy = RetryPolicy::builder().jitter(0.0).build();

        assert_eq!(policy.calculate_delay(0), Duration::from_secs(1));
        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
    }
}
