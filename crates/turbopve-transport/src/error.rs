//! Transport error types

use std::fmt;
use turbopve_core::cancel::Cancelled;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur before a complete HTTP response is received.
///
/// A response with a non-2xx status is *not* a transport error; it is
/// returned as an [`HttpResponse`](crate::HttpResponse) for the caller to
/// classify.
#[derive(Debug)]
pub enum TransportError {
    /// Protocol-level failure (malformed response, body read failure)
    Http(String),

    /// Connection could not be established (DNS, refused, TLS handshake)
    Connection(String),

    /// I/O error
    Io(std::io::Error),

    /// The request or connect timeout elapsed
    Timeout,

    /// The request could not be built (bad header, bad URL)
    InvalidRequest(String),

    /// The caller's context fired before or between attempts
    Cancelled(Cancelled),

    /// Generic transport error
    Other(String),
}

impl TransportError {
    /// Whether the failure is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Whether the failure is a connection failure.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(msg) => write!(f, "HTTP error: {}", msg),
            Self::Connection(msg) => write!(f, "Connection error: {}", msg),
            Self::Io(err) => write!(f, "I/O error: {}", err),
            Self::Timeout => write!(f, "Timeout"),
            Self::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Self::Cancelled(reason) => write!(f, "Cancelled: {}", reason),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Cancelled(reason) => Some(reason),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<Cancelled> for TransportError {
    fn from(reason: Cancelled) -> Self {
        Self::Cancelled(reason)
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}
