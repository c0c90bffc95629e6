//! Exponential backoff with jitter.

use super::strategy::BackoffStrategy;
use std::time::Duration;

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_JITTER: f64 = 0.1;

/// Exponential backoff strategy with configurable jitter.
///
/// For attempt `n` (0-indexed after the first failure):
/// ```text
/// base_delay   = initial_delay * multiplier^n
/// jittered     = base_delay ± base_delay * jitter
/// final_delay  = min(jittered, max_delay)
/// ```
///
/// Defaults: 3 retries, 1s initial delay, 30s cap, multiplier 2.0, 10% jitter.
///
/// # Examples
///
/// ```rust
/// use turbopve_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(5)
///     .initial_delay(Duration::from_millis(200))
///     .max_delay(Duration::from_secs(10))
///     .jitter(0.0)
///     .build();
///
/// assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(400)));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: u32,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// A strategy that never retries.
    pub fn none() -> Self {
        Self::builder().max_retries(0).build()
    }

    /// The configured delay before the first retry.
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// The configured cap on any single delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let jittered = if self.jitter > 0.0 {
            // Uniform in [base * (1 - jitter), base * (1 + jitter)]
            let jitter_amount = base_delay * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + jitter_amount
        } else {
            base_delay
        };

        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Some(Duration::from_secs_f64(capped))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Builder for configuring [`ExponentialBackoff`].
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the maximum number of retry attempts. Default: 3
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the delay before the first retry. Default: 1s
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries. Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier. Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier.max(1.0));
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`. Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the [`ExponentialBackoff`], using defaults for unset fields.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
            initial_delay: self.initial_delay.unwrap_or(DEFAULT_INITIAL_DELAY),
            max_delay: self.max_delay.unwrap_or(DEFAULT_MAX_DELAY),
            multiplier: self.multiplier.unwrap_or(DEFAULT_MULTIPLIER),
            jitter: self.jitter.unwrap_or(DEFAULT_JITTER),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{Cancelled, Context};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
        Cancelled(Cancelled),
    }

    impl From<Cancelled> for TestError {
        fn from(c: Cancelled) -> Self {
            TestError::Cancelled(c)
        }
    }

    fn fast(max_retries: u32) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .jitter(0.0)
            .build()
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let backoff = ExponentialBackoff::builder()
            .max_retries(5)
            .initial_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .jitter(0.0)
            .build();

        assert_eq!(backoff.next_delay(0), Some(Duration::from_millis(100)));
        assert_eq!(backoff.next_delay(1), Some(Duration::from_millis(200)));
        assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(400)));
        assert_eq!(backoff.next_delay(3), Some(Duration::from_millis(800)));
        assert_eq!(backoff.next_delay(5), None);
    }

    #[test]
    fn test_default_window_is_one_to_thirty_seconds() {
        let backoff = ExponentialBackoff::builder().jitter(0.0).max_retries(10).build();

        assert_eq!(backoff.next_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(backoff.next_delay(6), Some(Duration::from_secs(30)));
        assert_eq!(backoff.next_delay(9), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builder_defaults() {
        let backoff = ExponentialBackoff::default();

        assert_eq!(backoff.max_retries, 3);
        assert_eq!(backoff.initial_delay, Duration::from_secs(1));
        assert_eq!(backoff.max_delay, Duration::from_secs(30));
        assert_eq!(backoff.multiplier, 2.0);
        assert_eq!(backoff.jitter, 0.1);
    }

    #[test]
    fn test_jitter_bounds() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_secs(1))
            .jitter(0.5)
            .build();

        for _ in 0..20 {
            let millis = backoff.next_delay(0).unwrap().as_millis();
            assert!((500..=1500).contains(&millis), "got {millis}ms");
        }
    }

    #[test]
    fn test_jitter_clamped() {
        assert_eq!(ExponentialBackoff::builder().jitter(2.0).build().jitter, 1.0);
        assert_eq!(ExponentialBackoff::builder().jitter(-0.5).build().jitter, 0.0);
    }

    #[test]
    fn test_none_never_retries() {
        let backoff = ExponentialBackoff::none();
        assert_eq!(backoff.max_retries(), 0);
        assert_eq!(backoff.next_delay(0), None);
    }

    #[tokio::test]
    async fn test_retry_success_on_third_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result = fast(5)
            .execute(
                &Context::background(),
                |_| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                            Err(TestError::Transient)
                        } else {
                            Ok(42)
                        }
                    }
                },
                |err, _| *err == TestError::Transient,
            )
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast(2)
            .execute(
                &Context::background(),
                |_| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(TestError::Transient)
                    }
                },
                |_, _| true,
            )
            .await;

        assert_eq!(result, Err(TestError::Transient));
        // initial attempt + 2 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_predicate_stops_retries() {
        let attempts = Arc::new(AtomicU32::new(0));

        let result: Result<(), _> = fast(5)
            .execute(
                &Context::background(),
                |_| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Err(TestError::Fatal)
                    }
                },
                |err, _| *err == TestError::Transient,
            )
            .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_operation() {
        let (ctx, handle) = Context::cancellable();
        handle.cancel();

        let attempts = Arc::new(AtomicU32::new(0));
        let result: Result<(), _> = fast(3)
            .execute(
                &ctx,
                |_| {
                    let attempts = Arc::clone(&attempts);
                    async move {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                |_, _| true,
            )
            .await;

        assert_eq!(result, Err(TestError::Cancelled(Cancelled::Cancelled)));
        assert_eq!(attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_backoff() {
        let backoff = ExponentialBackoff::builder()
            .max_retries(3)
            .initial_delay(Duration::from_secs(10))
            .jitter(0.0)
            .build();
        let ctx = Context::background().with_timeout(Duration::from_secs(1));

        let result: Result<(), _> = backoff
            .execute(&ctx, |_| async { Err(TestError::Transient) }, |_, _| true)
            .await;

        assert_eq!(
            result,
            Err(TestError::Cancelled(Cancelled::DeadlineExceeded))
        );
    }
}
