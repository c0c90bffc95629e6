//! # TurboPVE
//!
//! Async Rust client for the Proxmox VE REST API supporting:
//! - Ticket (username/password) and API-token authentication
//! - Transparent re-login when a session ticket expires
//! - Client-side rate limiting and transport retries with backoff
//! - Cancellation and deadlines through [`Context`]
//! - Typed access to nodes, guests, storage, tasks, users and the cluster
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use turbopve::{Client, WaitOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://pve.example.com:8006")
//!         .token("root@pam", "automation", "00000000-0000-0000-0000-000000000000")
//!         .build()?;
//!
//!     for node in client.nodes().list().await? {
//!         println!("{} is {:?}", node.node, node.status);
//!     }
//!
//!     let upid = client.vms().start(100).await?;
//!     let status = client.tasks().wait(&upid, &WaitOptions::default()).await?;
//!     println!("start finished: {:?}", status.exitstatus);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::{Client, ClientBuilder};
pub use config::{AuthConfig, AuthKind, ClientConfig, ClientConfigBuilder, RateLimitConfig};
pub use error::{Error, Result};
pub use http::RawResponse;
pub use ratelimit::{RateLimiter, TokenBucketLimiter};
pub use types::*;

// Module declarations
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod observability;
pub mod ratelimit;
pub mod resources;
pub mod types;

// Re-export key dependencies for convenience
pub use async_trait::async_trait;
pub use turbopve_core::cancel::{CancelHandle, Cancelled, Context};
pub use turbopve_transport::{HttpTransport, Transport, TransportError};

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use turbopve::prelude::*;
/// ```
pub mod prelude {

    pub use crate::{
        AuthConfig, Client, ClientConfig, Context, Error, Result,
        types::{Upid, VmKind, WaitOptions},
    };
}

/// Crate version, automatically updated from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server URL
pub const DEFAULT_BASE_URL: &str = "https://localhost:8006/";

/// Path prefix of every API endpoint, relative to the server URL
pub const API_PREFIX: &str = "api2/json/";

/// Default `User-Agent` header value
pub const DEFAULT_USER_AGENT: &str = concat!("turbopve-rust/", env!("CARGO_PKG_VERSION"));
