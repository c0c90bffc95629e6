//! HTTP layer of the client
//!
//! Requests are described with [`RequestBuilder`], executed by the shared
//! executor (rate limiting, credentials, session renewal) and come back as
//! [`RawResponse`] for decoding.

pub use request::{PendingRequest, RequestBuilder};
pub use response::{RawResponse, classify_error};

pub(crate) use executor::Executor;

mod executor;
mod request;
mod response;

// Re-export HTTP types from the http crate for convenience
pub use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
