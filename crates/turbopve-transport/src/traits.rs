//! Transport trait and the request/response types it exchanges.

use crate::error::{Result, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode};
use std::time::Duration;
use turbopve_core::cancel::Context;
use url::Url;

/// HTTP request specification
///
/// A fully resolved request: absolute URL with encoded query, final headers
/// and an in-memory body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: Method,

    /// Absolute request URL
    pub url: Url,

    /// Request headers
    pub headers: HeaderMap,

    /// Request body (optional)
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request with no headers and no body
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Add a header to the request, replacing any previous value
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from string parts
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidRequest`] if the name or value is not
    /// a valid header.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::InvalidRequest(format!("header value for {name}: {e}")))?;
        Ok(self.with_header(name, value))
    }

    /// Set the request body
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether replaying this request cannot change server state twice.
    pub fn is_idempotent(&self) -> bool {
        crate::http::retry::is_idempotent(&self.method)
    }
}

/// HTTP response
///
/// The body is always read fully into memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: StatusCode,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body
    pub body: Bytes,

    /// Wall time of the successful attempt
    pub elapsed: Duration,

    /// Number of physical attempts made (1 when no retry happened)
    pub attempts: u32,
}

impl HttpResponse {
    /// Create a new HTTP response from a single attempt
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
            elapsed: Duration::ZERO,
            attempts: 1,
        }
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Check if response is an error (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// Get the response body as a string, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse response body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the response body cannot be parsed as valid JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| TransportError::Other(e.to_string()))
    }

    /// Get a header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Generic transport trait
///
/// Implementations perform the physical exchange, including any
/// transport-level retries, and must observe `ctx` between attempts. An
/// attempt already on the wire is allowed to finish.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Send an HTTP request and receive a complete response
    async fn send(&self, request: HttpRequest, ctx: &Context) -> Result<HttpResponse>;
}
