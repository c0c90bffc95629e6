//! HTTP transport client implementation
//!
//! Implements the Transport trait on top of reqwest with bounded retries for
//! transient network failures.

use crate::error::{Result, TransportError};
use crate::traits::{HttpRequest, HttpResponse, Transport};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use turbopve_core::cancel::Context;

pub use super::retry::RetryPolicy;
use turbopve_core::retry::BackoffStrategy;

/// HTTP transport implementation
///
/// Handles HTTP requests with:
/// - Automatic retries with exponential backoff
/// - Connection pooling
/// - Timeout handling
/// - Cancellation between attempts
#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<ReqwestClient>,
    retry_policy: RetryPolicy,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("retry_policy", &self.retry_policy)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a new HTTP transport with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpTransportConfig::default())
    }

    /// Create a new HTTP transport with custom configuration
    pub fn with_config(config: HttpTransportConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent);

        if config.danger_accept_invalid_certs {
            warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            retry_policy: config.retry_policy,
            timeout: config.timeout,
        })
    }

    /// Wrap an existing reqwest client (custom TLS roots, proxies, ...)
    pub fn from_reqwest(client: ReqwestClient, retry_policy: RetryPolicy) -> Self {
        Self {
            client: Arc::new(client),
            retry_policy,
            timeout: HttpTransportConfig::default().timeout,
        }
    }

    /// Get a reference to the underlying reqwest client
    pub fn reqwest_client(&self) -> Arc<ReqwestClient> {
        self.client.clone()
    }

    /// Set the retry policy
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// The retry policy in use
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// The per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest, ctx: &Context) -> Result<HttpResponse> {
        let method = request.method.clone();
        let request = &request;

        // Any received response, error statuses included, ends the loop.
        self.retry_policy
            .execute(
                ctx,
                move |attempt| self.try_send_request(request, attempt),
                |err, attempt| {
                    let retry = RetryPolicy::should_retry_error(&method, err);
                    if retry {
                        warn!(
                            method = %method,
                            url = %request.url,
                            attempt = attempt + 1,
                            error = %err,
                            "Retrying request"
                        );
                    }
                    retry
                },
            )
            .await
    }
}

impl HttpTransport {
    async fn try_send_request(
        &self,
        request: &HttpRequest,
        attempt: u32,
    ) -> Result<HttpResponse> {
        let mut req = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(body) = &request.body {
            req = req.body(body.clone());
        }

        debug!(
            method = %request.method,
            url = %request.url,
            attempt = attempt + 1,
            "Sending HTTP request"
        );

        let started = Instant::now();
        let response = req
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
            elapsed: started.elapsed(),
            attempts: attempt + 1,
        })
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Per-attempt request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// `User-Agent` sent with every request
    pub user_agent: String,

    /// Skip TLS certificate and hostname verification.
    ///
    /// Only for lab hosts with self-signed certificates. Anyone on the
    /// network path can impersonate the server when this is set.
    pub danger_accept_invalid_certs: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            retry_policy: RetryPolicy::default(),
            user_agent: concat!("turbopve-transport/", env!("CARGO_PKG_VERSION")).to_string(),
            danger_accept_invalid_certs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_transport_creation() {
        let transport = HttpTransport::new().expect("Failed to create transport");
        assert_eq!(transport.timeout(), Duration::from_secs(30));
        assert_eq!(transport.retry_policy().max_retries(), 3);
    }

    #[test]
    fn test_http_transport_with_config() {
        let config = HttpTransportConfig {
            timeout: Duration::from_secs(5),
            danger_accept_invalid_certs: true,
            retry_policy: RetryPolicy::none(),
            ..Default::default()
        };

        let transport = HttpTransport::with_config(config).expect("Failed to create transport");
        assert_eq!(transport.timeout(), Duration::from_secs(5));
        assert_eq!(transport.retry_policy().max_retries(), 0);
    }

    #[test]
    fn test_debug_hides_client() {
        let transport = HttpTransport::new().unwrap();
        let debug = format!("{transport:?}");
        assert!(debug.starts_with("HttpTransport"));
    }
}
