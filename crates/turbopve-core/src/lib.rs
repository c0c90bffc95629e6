#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions for the TurboPVE client.
//!
//! This crate holds the pieces shared by the transport and the client:
//!
//! - **Cancellation** via [`cancel::Context`], a cheap-to-clone scope with an
//!   optional cancel signal and an optional deadline
//! - **Retry strategies** via the [`retry::BackoffStrategy`] trait and
//!   [`retry::ExponentialBackoff`]
//!
//! # Examples
//!
//! ```rust
//! use turbopve_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let ctx = Context::background().with_timeout(Duration::from_secs(30));
//! let backoff = ExponentialBackoff::builder()
//!     .max_retries(3)
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let value = backoff
//!     .execute(&ctx, |_| async { Ok::<_, Cancelled>(42) }, |_, _| false)
//!     .await;
//! assert_eq!(value, Ok(42));
//! # }
//! ```

pub mod cancel;
pub mod retry;

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::cancel::{CancelHandle, Cancelled, Context};
    pub use crate::retry::{BackoffStrategy, ExponentialBackoff, ExponentialBackoffBuilder};
}
