//! HTTP transport implementation
//!
//! Provides an HTTP client that implements the Transport trait.
//! Handles retries, timeouts and TLS settings.

pub mod client;
pub mod retry;

pub use client::{HttpTransport, HttpTransportConfig};
pub use retry::RetryPolicy;
