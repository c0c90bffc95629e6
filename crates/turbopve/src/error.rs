//! Error types for the Proxmox VE client
//!
//! One `thiserror` enum covers every failure a caller can observe. Transport
//! failures are wrapped, cancellation is folded into its own variant, and
//! non-2xx responses are classified into [`Error::Api`] with whatever
//! messages the server put in its error envelope.

use http::StatusCode;
use thiserror::Error;
use turbopve_core::cancel::Cancelled;
use turbopve_transport::TransportError;

/// Result type alias for operations that can fail with a client error.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Proxmox VE client.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing client configuration (e.g. token auth without a
    /// token secret). Never retried.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The base URL or a request path could not be turned into a URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network-level failure left over after transport retries.
    #[error("Transport error: {0}")]
    Transport(#[source] TransportError),

    /// The caller's context was cancelled or its deadline passed.
    #[error("Request cancelled: {0}")]
    Cancelled(#[from] Cancelled),

    /// Login rejected, unexpected login response, or a request still
    /// unauthorized after re-authentication.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// A response body did not match the expected shape.
    #[error("Failed to decode response: {message}")]
    Decode {
        /// Parser error
        message: String,
        /// Raw response body for diagnostics
        body: String,
    },

    /// The server answered with a non-2xx status.
    #[error("API error (status {status}): {}", api_summary(.status, .messages, .body))]
    Api {
        /// HTTP status code
        status: StatusCode,
        /// Messages parsed from the error envelope (may be empty)
        messages: Vec<String>,
        /// Raw response body
        body: String,
    },

    /// Request parameters could not be built or serialized.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A client-side lookup found nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The operation does not apply to this kind of guest.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl Error {
    /// Classify a non-2xx response.
    ///
    /// Understands the PVE error envelope: `errors` as a list of strings or
    /// as a `{parameter: reason}` map, plus an optional `message` or string
    /// `data`. A body that is not such an envelope still yields an
    /// [`Error::Api`] carrying the status and the raw body.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let body_text = String::from_utf8_lossy(body).into_owned();
        let messages = serde_json::from_slice::<ApiErrorResponse>(body)
            .map(ApiErrorResponse::into_messages)
            .unwrap_or_default();

        Error::Api {
            status,
            messages,
            body: body_text,
        }
    }

    /// Check if this error is transient.
    ///
    /// The client never retries these by itself beyond what the transport
    /// already did; the flag is for callers running their own loops.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout() || e.is_connection(),
            Error::Api { status, .. } => matches!(
                *status,
                StatusCode::TOO_MANY_REQUESTS
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            _ => false,
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Messages parsed from an API error envelope; empty for other variants.
    pub fn messages(&self) -> &[String] {
        match self {
            Error::Api { messages, .. } => messages,
            _ => &[],
        }
    }

    /// Whether this is an API error with status 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled(reason) => Error::Cancelled(reason),
            TransportError::InvalidRequest(msg) => Error::InvalidRequest(msg),
            other => Error::Transport(other),
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        Error::InvalidRequest(format!("missing required field `{}`", err.field_name()))
    }
}

fn api_summary(status: &StatusCode, messages: &[String], body: &str) -> String {
    if !messages.is_empty() {
        messages.join("; ")
    } else if !body.trim().is_empty() {
        body.trim().to_string()
    } else {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    }
}

// Helper structures for parsing API error responses

#[derive(Debug, serde::Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    errors: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl ApiErrorResponse {
    fn into_messages(self) -> Vec<String> {
        let mut messages = Vec::new();

        match self.errors {
            Some(serde_json::Value::Array(items)) => {
                messages.extend(items.into_iter().map(value_text));
            }
            Some(serde_json::Value::Object(fields)) => {
                messages.extend(
                    fields
                        .into_iter()
                        .map(|(field, reason)| format!("{field}: {}", value_text(reason).trim())),
                );
            }
            Some(serde_json::Value::String(s)) if !s.is_empty() => messages.push(s),
            _ => {}
        }

        if let Some(message) = self.message.filter(|m| !m.trim().is_empty()) {
            messages.push(message.trim().to_string());
        }

        if let Some(serde_json::Value::String(data)) = self.data
            && !data.is_empty()
        {
            messages.push(data);
        }

        messages
    }
}

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
