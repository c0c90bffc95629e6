//! HTTP transport abstraction layer for TurboPVE
//!
//! Provides a trait-based transport so the client core never talks to an
//! HTTP library directly. Tests and embedders can swap in their own
//! [`Transport`]; the default is [`HttpTransport`] on reqwest.
//!
//! # Architecture
//!
//! - **Transport trait**: one physical exchange, cancellation-aware
//! - **HTTP transport**: reqwest client with bounded retries for network failures
//! - **Error handling**: [`TransportError`] for everything short of a response

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use turbopve_transport::{HttpRequest, HttpTransport, Transport};
//! use turbopve_core::cancel::Context;
//!
//! let transport = HttpTransport::new()?;
//! let url = url::Url::parse("https://pve.local:8006/api2/json/version")?;
//! let request = HttpRequest::new(http::Method::GET, url);
//! let response = transport.send(request, &Context::background()).await?;
//! ```

pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use crate::http::{HttpTransport, HttpTransportConfig};
pub use traits::{HttpRequest, HttpResponse, Transport};
