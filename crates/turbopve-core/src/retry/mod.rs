//! Retry strategies and backoff implementations.
//!
//! - [`BackoffStrategy`] - delay schedule plus a cancellation-aware retry loop
//! - [`ExponentialBackoff`] - exponential backoff with jitter
//!
//! The HTTP transport uses these to replay requests that failed before a
//! response arrived.

mod exponential;
mod strategy;

pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use strategy::BackoffStrategy;
