//! Cancellation contexts.
//!
//! A [`Context`] carries an optional cancel signal and an optional deadline.
//! Anything that suspends on behalf of a caller (rate-limit waits, retry
//! backoff, task polling) races its own future against
//! [`Context::cancelled`] and reports [`Cancelled`] when the context fires
//! first.
//!
//! ```rust
//! use std::time::Duration;
//! use turbopve_core::cancel::Context;
//!
//! # async fn example() {
//! let (ctx, handle) = Context::cancellable();
//! let ctx = ctx.with_timeout(Duration::from_secs(5));
//!
//! handle.cancel();
//! assert!(ctx.check().is_err());
//! # }
//! ```

use std::future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Reason a context stopped an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Cancelled {
    /// The owning [`CancelHandle`] was triggered.
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// A cancellation scope passed down through every suspending call.
///
/// Cloning is cheap; clones observe the same signal and deadline.
#[derive(Debug, Clone, Default)]
pub struct Context {
    signal: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context paired with the handle that cancels it.
    #[must_use]
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            signal: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx: Arc::new(tx) })
    }

    /// Derive a context whose deadline is at most `timeout` from now.
    ///
    /// An earlier existing deadline is kept.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Derive a context that expires at `deadline` (or earlier, if already set).
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// The effective deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline. `None` when there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Whether the signal fired or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Non-blocking check of the context state.
    pub fn check(&self) -> Result<(), Cancelled> {
        if let Some(rx) = &self.signal
            && *rx.borrow()
        {
            return Err(Cancelled::Cancelled);
        }
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(Cancelled::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for [`Context::background`]. If every [`CancelHandle`]
    /// is dropped without cancelling, only the deadline can fire.
    pub async fn cancelled(&self) -> Cancelled {
        let signal = async {
            if let Some(mut rx) = self.signal.clone() {
                let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
                if fired {
                    return;
                }
            }
            future::pending::<()>().await;
        };

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = signal => Cancelled::Cancelled,
            () = deadline => Cancelled::DeadlineExceeded,
        }
    }

    /// Sleep for `duration` unless the context fires first.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        self.check()?;
        tokio::select! {
            () = tokio::time::sleep(duration) => Ok(()),
            reason = self.cancelled() => Err(reason),
        }
    }

    /// Drive `fut` to completion unless the context fires first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            out = fut => Ok(out),
            reason = self.cancelled() => Err(reason),
        }
    }
}

/// Triggers cancellation of the [`Context`] it was created with.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Cancel every clone of the paired context. Idempotent.
    pub fn cancel(&self) {
        let was_cancelled = self.tx.send_replace(true);
        if !was_cancelled {
            #[cfg(feature = "tracing")]
            tracing::debug!("context cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}
