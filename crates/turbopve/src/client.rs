//! Main client implementation for the Proxmox VE API

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderValue, Method};
use secrecy::SecretString;
use turbopve_core::cancel::Context;
use turbopve_transport::http::RetryPolicy;
use turbopve_transport::{HttpTransport, HttpTransportConfig, Transport};
use url::Url;

use crate::{
    API_PREFIX, DEFAULT_BASE_URL, DEFAULT_USER_AGENT,
    auth::{Authenticator, SessionState},
    config::{AuthConfig, AuthKind, ClientConfig, RateLimitConfig},
    error::{Error, Result},
    http::{Executor, PendingRequest, RawResponse, RequestBuilder},
    ratelimit::{RateLimiter, TokenBucketLimiter},
    resources::{Access, Cluster, Lxc, Nodes, Qemu, Storage, Tasks, Version, Vms},
};

/// Client for the Proxmox VE API.
///
/// Cheap to clone; clones share the session, the rate limiter and the
/// connection pool. Calls are cancelled through the [`Context`] attached
/// with [`with_context`](Self::with_context).
///
/// # Example
///
/// ```rust,no_run
/// use turbopve::Client;
///
/// # async fn example() -> turbopve::Result<()> {
/// let client = Client::builder()
///     .base_url("https://pve.example.com:8006")
///     .token("root@pam", "automation", "2f0e7c1a-5b9d-4f6e-8a3c-9d1b2e4f6a7c")
///     .build()?;
///
/// for node in client.nodes().list().await? {
///     println!("{} is {}", node.node, node.status.as_deref().unwrap_or("unknown"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    ctx: Context,
}

struct ClientInner {
    base_url: Url,
    api_url: Url,
    executor: Executor,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("executor", &self.inner.executor)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new client builder for advanced configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Create a client from a configuration object.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidUrl`] for a malformed base URL, [`Error::Config`] for
    /// an unusable user agent, rate limit or HTTP client setup.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        ClientBuilder {
            config,
            ..Default::default()
        }
        .build()
    }

    /// Load configuration from `PVE_*` environment variables and build a
    /// client from it.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        Self::from_config(ClientConfig::from_env()?)
    }

    /// A handle whose calls observe `ctx` for cancellation and deadlines.
    ///
    /// The session and the rate limiter stay shared with `self`.
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ctx,
        }
    }

    /// A handle whose calls fail once `timeout` has elapsed.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_context(self.ctx.clone().with_timeout(timeout))
    }

    /// Context observed by this handle.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Base URL of the API host, always ending in `/`.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Authentication scheme in effect.
    pub fn auth_kind(&self) -> AuthKind {
        self.inner.executor.auth().kind()
    }

    /// Snapshot of the current session credentials.
    pub async fn session(&self) -> SessionState {
        self.inner.executor.auth().session().await
    }

    /// Authenticate now instead of on the first request.
    ///
    /// For token auth this only validates the configuration; no request is
    /// sent.
    pub async fn authenticate(&self) -> Result<()> {
        self.inner.executor.auth().authenticate(&self.ctx).await
    }

    /// Drop the current session; the next request logs in again.
    pub async fn invalidate_session(&self) {
        self.inner.executor.auth().invalidate().await;
    }

    pub(crate) async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<crate::types::Ticket> {
        self.inner
            .executor
            .auth()
            .login(&self.ctx, username, password, None)
            .await
    }

    /// Start a request to `path` below `api2/json/`.
    ///
    /// The path is split on `/`; each piece is percent-encoded as one
    /// segment. Use [`request_segments`](Self::request_segments) when a
    /// segment itself contains `/` (volume ids, for example).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        self.request_segments(method, segments)
    }

    /// Start a request to the path made of `segments` below `api2/json/`.
    pub fn request_segments<I, S>(&self, method: Method, segments: I) -> RequestBuilder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<String> = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let path = segments.join("/");
        let url = self.endpoint(&segments);
        RequestBuilder::new(self.clone(), method, url, path)
    }

    /// Execute a built request and return the raw response.
    ///
    /// Non-2xx statuses are not errors at this level; see
    /// [`RawResponse::error_for_status`].
    pub async fn execute(&self, request: &PendingRequest) -> Result<RawResponse> {
        self.inner.executor.execute(request, &self.ctx).await
    }

    fn endpoint(&self, segments: &[String]) -> Result<Url> {
        let mut url = self.inner.api_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                Error::InvalidUrl(format!("{} cannot be a base URL", self.inner.api_url))
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Access control: users, roles, permissions, tickets.
    pub fn access(&self) -> Access {
        Access::new(self.clone())
    }

    /// Cluster-wide status, resources and tasks.
    pub fn cluster(&self) -> Cluster {
        Cluster::new(self.clone())
    }

    /// Node-level operations.
    pub fn nodes(&self) -> Nodes {
        Nodes::new(self.clone())
    }

    /// QEMU virtual machines on a given node.
    pub fn qemu(&self) -> Qemu {
        Qemu::new(self.clone())
    }

    /// LXC containers on a given node.
    pub fn lxc(&self) -> Lxc {
        Lxc::new(self.clone())
    }

    /// Guests addressed by VMID alone, located through the cluster.
    pub fn vms(&self) -> Vms {
        Vms::new(self.clone())
    }

    /// Storage pools and their content.
    pub fn storage(&self) -> Storage {
        Storage::new(self.clone())
    }

    /// Asynchronous server tasks.
    pub fn tasks(&self) -> Tasks {
        Tasks::new(self.clone())
    }

    /// Version and package information.
    pub fn version(&self) -> Version {
        Version::new(self.clone())
    }
}

/// Parse and normalize the base URL: absolute http(s), trailing slash.
fn parse_base_url(raw: Option<&str>) -> Result<Url> {
    let raw = raw.unwrap_or(DEFAULT_BASE_URL).trim();
    if raw.is_empty() {
        return Err(Error::InvalidUrl("base URL is empty".to_string()));
    }

    let mut url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme '{}' in {raw}, expected http or https",
            url.scheme()
        )));
    }
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("{raw} cannot be a base URL")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Builder for creating a configured Client.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    context: Option<Context>,
}

impl ClientBuilder {
    /// Start from an existing configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL of the API host.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the credentials.
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.config.auth = auth;
        self
    }

    /// Use password (ticket) authentication.
    pub fn password(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.auth = AuthConfig::password(username, password);
        self
    }

    /// Use API token authentication.
    pub fn token(
        mut self,
        username: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        self.config.auth = AuthConfig::token(username, token_id, token_secret);
        self
    }

    /// Set the per-attempt request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the maximum number of transport retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Set the `User-Agent` header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Skip TLS certificate verification.
    ///
    /// Anyone on the network path can impersonate the server when this is
    /// set. Only for lab hosts with self-signed certificates.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    /// Configure the built-in rate limiter.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Replace the built-in rate limiter.
    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Replace the built-in HTTP transport.
    ///
    /// Timeout, retry and TLS settings are then up to `transport`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Default context for calls made through the built client.
    pub fn context(mut self, ctx: Context) -> Self {
        self.context = Some(ctx);
        self
    }

    /// Build the client with the configured options.
    pub fn build(self) -> Result<Client> {
        let config = self.config;
        let base_url = parse_base_url(config.base_url.as_deref())?;
        let api_url = base_url
            .join(API_PREFIX)
            .map_err(|e| Error::InvalidUrl(format!("{base_url}{API_PREFIX}: {e}")))?;
        let login_url = api_url
            .join("access/ticket")
            .map_err(|e| Error::InvalidUrl(format!("{api_url}access/ticket: {e}")))?;

        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let user_agent_header = HeaderValue::from_str(&user_agent)
            .map_err(|e| Error::Config(format!("invalid user agent {user_agent:?}: {e}")))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let transport_config = HttpTransportConfig {
                    timeout: config.timeout,
                    connect_timeout: config.connection_pool.connect_timeout,
                    pool_max_idle_per_host: config.connection_pool.max_idle_per_host,
                    retry_policy: RetryPolicy::builder()
                        .max_retries(config.max_retries)
                        .build(),
                    user_agent,
                    danger_accept_invalid_certs: config.danger_accept_invalid_certs,
                };
                let transport = HttpTransport::with_config(transport_config)
                    .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
                Arc::new(transport)
            }
        };

        let rate_limiter: Option<Arc<dyn RateLimiter>> = match self.rate_limiter {
            Some(limiter) => Some(limiter),
            None => TokenBucketLimiter::from_config(&config.rate_limit)?
                .map(|limiter| Arc::new(limiter) as Arc<dyn RateLimiter>),
        };

        let auth = Arc::new(Authenticator::new(
            config.auth,
            login_url,
            user_agent_header.clone(),
            Arc::clone(&transport),
        ));
        let executor = Executor::new(transport, rate_limiter, auth, user_agent_header);

        Ok(Client {
            inner: Arc::new(ClientInner {
                base_url,
                api_url,
                executor,
            }),
            ctx: self.context.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn token_client(base_url: &str) -> Result<Client> {
        Client::builder()
            .base_url(base_url)
            .token("root@pam", "ci", "secret")
            .build()
    }

    #[test]
    fn test_client_builder() {
        let client = Client::builder()
            .base_url("https://pve.example.com:8006")
            .password("root@pam", "secret")
            .timeout(Duration::from_secs(10))
            .max_retries(1)
            .build();

        assert!(client.is_ok());
        assert_eq!(client.unwrap().auth_kind(), AuthKind::Password);
    }

    #[test]
    fn test_default_base_url() {
        let client = Client::builder()
            .token("root@pam", "ci", "secret")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://localhost:8006/");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = token_client("https://pve.example.com:8006/proxy").unwrap();
        assert_eq!(client.base_url().as_str(), "https://pve.example.com:8006/proxy/");

        let request = client.request(Method::GET, "/version").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "https://pve.example.com:8006/proxy/api2/json/version"
        );
    }

    #[test]
    fn test_client_from_config_invalid_scheme() {
        let result = token_client("ftp://pve.example.com");
        assert_matches!(result, Err(Error::InvalidUrl(msg)) => {
            assert!(msg.contains("ftp"));
            assert!(msg.contains("http"));
        });
    }

    #[test]
    fn test_client_from_config_empty_url() {
        let result = token_client("   ");
        assert_matches!(result, Err(Error::InvalidUrl(msg)) => {
            assert!(msg.contains("empty"));
        });
    }

    #[test]
    fn test_client_rejects_relative_url() {
        assert_matches!(token_client("pve.example.com:8006"), Err(Error::InvalidUrl(_)));
        assert_matches!(token_client("/api"), Err(Error::InvalidUrl(_)));
    }

    #[test]
    fn test_invalid_user_agent() {
        let result = Client::builder()
            .user_agent("bad\nagent")
            .token("root@pam", "ci", "secret")
            .build();
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[test]
    fn test_invalid_rate_limit() {
        let result = Client::builder()
            .rate_limit(RateLimitConfig::new(0.0, 1))
            .build();
        assert_matches!(result, Err(Error::Config(_)));
    }

    #[test]
    fn test_client_clone_shares_inner() {
        let client1 = token_client("https://pve.example.com:8006").unwrap();
        let client2 = client1.clone();
        assert!(Arc::ptr_eq(&client1.inner, &client2.inner));

        let (ctx, _handle) = Context::cancellable();
        let scoped = client1.with_context(ctx);
        assert!(Arc::ptr_eq(&client1.inner, &scoped.inner));
        assert!(!scoped.context().is_cancelled());
    }

    #[tokio::test]
    async fn test_token_authenticate_needs_no_network() {
        // Nothing listens on this host; token auth must not try to connect.
        let client = token_client("https://pve.invalid:8006").unwrap();
        client.authenticate().await.unwrap();

        let session = client.session().await;
        assert_eq!(session.static_token(), Some("PVEAPIToken=root@pam!ci=secret"));
        assert!(session.cookie().is_none());
    }

    #[tokio::test]
    async fn test_token_authenticate_missing_secret() {
        let client = Client::builder()
            .base_url("https://pve.invalid:8006")
            .auth(AuthConfig {
                username: "root@pam".into(),
                token_id: Some("ci".into()),
                ..Default::default()
            }
            .with_kind(AuthKind::Token))
            .build()
            .unwrap();

        assert_matches!(client.authenticate().await, Err(Error::Config(_)));
        assert!(!client.session().await.is_authenticated());
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_client_from_env() {
        temp_env::with_vars(
            [
                ("PVE_BASE_URL", Some("https://env-host:8006")),
                ("PVE_USERNAME", Some("root@pam")),
                ("PVE_TOKEN_ID", Some("ci")),
                ("PVE_TOKEN_SECRET", Some("secret")),
                ("PVE_TIMEOUT", None),
                ("PVE_MAX_RETRIES", None),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.base_url().as_str(), "https://env-host:8006/");
                assert_eq!(client.auth_kind(), AuthKind::Token);
            },
        );
    }
}
