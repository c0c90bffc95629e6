//! The retry strategy trait.

use crate::cancel::{Cancelled, Context};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// A strategy for retrying failed operations with backoff.
///
/// Implementations decide how long to wait between attempts and how many
/// retries are allowed. Whether a particular failure is worth retrying is
/// the caller's call, passed to [`execute`](BackoffStrategy::execute) as a
/// predicate, since only the caller knows (for example) whether the request
/// it is replaying is idempotent.
///
/// # Examples
///
/// ```rust
/// use turbopve_core::cancel::{Cancelled, Context};
/// use turbopve_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// #[derive(Debug)]
/// enum FetchError {
///     Flaky,
///     Cancelled(Cancelled),
/// }
///
/// impl From<Cancelled> for FetchError {
///     fn from(c: Cancelled) -> Self {
///         FetchError::Cancelled(c)
///     }
/// }
///
/// # async fn example() {
/// let backoff = ExponentialBackoff::builder()
///     .max_retries(3)
///     .initial_delay(Duration::from_millis(10))
///     .build();
///
/// let result = backoff
///     .execute(
///         &Context::background(),
///         |attempt| async move {
///             if attempt < 2 { Err(FetchError::Flaky) } else { Ok(42) }
///         },
///         |err, _attempt| matches!(err, FetchError::Flaky),
///     )
///     .await;
/// assert_eq!(result.unwrap(), 42);
/// # }
/// ```
#[async_trait]
pub trait BackoffStrategy: Send + Sync {
    /// Delay before retry number `attempt + 1` (0-indexed).
    ///
    /// `None` means no further retries should happen.
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of retries after the initial attempt.
    ///
    /// With `max_retries() == 3` an operation runs at most 4 times.
    fn max_retries(&self) -> u32;

    /// Run `operation` until it succeeds, `retryable` rejects the error,
    /// the retry budget is spent, or `ctx` fires.
    ///
    /// `operation` receives the 0-indexed attempt number. Cancellation is
    /// checked before every attempt and observed during backoff sleeps; an
    /// attempt already in progress is never interrupted.
    async fn execute<F, Fut, T, E, P>(
        &self,
        ctx: &Context,
        operation: F,
        retryable: P,
    ) -> Result<T, E>
    where
        F: Fn(u32) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<Cancelled> + Send,
        P: Fn(&E, u32) -> bool + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            ctx.check()?;
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.max_retries() || !retryable(&err, attempt) {
                        return Err(err);
                    }
                    let Some(delay) = self.next_delay(attempt) else {
                        return Err(err);
                    };
                    #[cfg(feature = "tracing")]
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
                    ctx.sleep(delay).await?;
                    attempt += 1;
                }
            }
        }
    }
}
