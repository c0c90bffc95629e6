//! Structured logging for API calls
//!
//! One [`ApiCall`] follows a logical request through the executor, so every
//! line it emits carries the same method, path, target node, guest id and
//! auth scheme, plus the number of session renewals taken so far.

use crate::config::AuthKind;
use http::{Method, StatusCode};
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Logging context for one logical API request.
#[derive(Debug, Clone)]
pub struct ApiCall {
    /// HTTP method
    pub method: Method,
    /// API path below the `api2/json/` prefix
    pub path: String,
    /// Node named by the path (`nodes/{node}/...`)
    pub node: Option<String>,
    /// Guest id named by the path (`nodes/{node}/qemu|lxc/{vmid}/...`)
    pub vmid: Option<u32>,
    /// Authentication scheme the request is sent with
    pub auth: AuthKind,
    /// Request body size in bytes
    pub body_size: Option<usize>,
    /// Session renewals taken after a 401
    pub reauths: u32,
    started: Instant,
}

impl ApiCall {
    /// Start tracking a request; the clock starts now.
    pub fn new(method: Method, path: impl Into<String>, auth: AuthKind) -> Self {
        let path = path.into();
        let (node, vmid) = path_target(&path);
        Self {
            method,
            path,
            node,
            vmid,
            auth,
            body_size: None,
            reauths: 0,
            started: Instant::now(),
        }
    }

    /// Set the request body size
    pub fn with_body_size(mut self, size: usize) -> Self {
        self.body_size = Some(size);
        self
    }

    /// Time since the call started, including rate-limit waits and logins.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Log an attempt about to go to the transport.
    pub fn log_attempt(&self) {
        debug!(
            method = %self.method,
            path = %self.path,
            node = self.node.as_deref(),
            vmid = self.vmid,
            auth = ?self.auth,
            body_size = self.body_size,
            reauths = self.reauths,
            "Sending API request"
        );
    }

    /// Record a session renewal after the server rejected the ticket.
    pub fn record_reauth(&mut self) {
        self.reauths += 1;
        warn!(
            method = %self.method,
            path = %self.path,
            node = self.node.as_deref(),
            vmid = self.vmid,
            reauths = self.reauths,
            "Session rejected, re-authenticating"
        );
    }

    /// Log the final response, at `info` for 2xx and `warn` otherwise.
    ///
    /// `transport_attempts` counts physical sends for the last attempt, so
    /// anything above one means the transport retried a network failure.
    pub fn log_response(&self, status: StatusCode, body_size: usize, transport_attempts: u32) {
        let retries = transport_attempts.saturating_sub(1);
        let elapsed_ms = self.elapsed().as_millis();
        if status.is_success() {
            info!(
                method = %self.method,
                path = %self.path,
                node = self.node.as_deref(),
                vmid = self.vmid,
                status = status.as_u16(),
                elapsed_ms,
                body_size,
                retries,
                reauths = self.reauths,
                "API request succeeded"
            );
        } else {
            warn!(
                method = %self.method,
                path = %self.path,
                node = self.node.as_deref(),
                vmid = self.vmid,
                status = status.as_u16(),
                elapsed_ms,
                error = status.canonical_reason().unwrap_or("error"),
                retries,
                reauths = self.reauths,
                "API request failed"
            );
        }
    }

    /// Log a request that never produced a response.
    pub fn log_undelivered(&self, error: &dyn Display) {
        warn!(
            method = %self.method,
            path = %self.path,
            node = self.node.as_deref(),
            vmid = self.vmid,
            elapsed_ms = self.elapsed().as_millis(),
            error = %error,
            reauths = self.reauths,
            "API request could not be delivered"
        );
    }
}

/// Node and guest id addressed by an API path, when it names them.
fn path_target(path: &str) -> (Option<String>, Option<u32>) {
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next() != Some("nodes") {
        return (None, None);
    }
    let node = segments.next().filter(|n| !n.is_empty()).map(str::to_string);
    let vmid = match (segments.next(), segments.next()) {
        (Some("qemu" | "lxc"), Some(id)) => id.parse().ok(),
        _ => None,
    };
    (node, vmid)
}

/// Install a `tracing-subscriber` formatter filtered by `RUST_LOG`.
///
/// Defaults to `turbopve=info` when `RUST_LOG` is unset. Calling it twice
/// is harmless; the second call leaves the first subscriber in place.
#[cfg(feature = "trace")]
#[cfg_attr(docsrs, doc(cfg(feature = "trace")))]
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("turbopve=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
