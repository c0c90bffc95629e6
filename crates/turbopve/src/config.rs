//! Configuration for the Proxmox VE client

use secrecy::SecretString;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of transport-level retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Authentication scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// Username/password login producing a session ticket and CSRF token.
    Password,
    /// Static API token (`user!tokenid=secret`), no login round trip.
    Token,
}

/// Credentials for the client.
///
/// Immutable once handed to the client. When `kind` is left unset the
/// scheme is picked from the fields present, see
/// [`resolved_kind`](Self::resolved_kind).
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// User including realm, e.g. `root@pam`
    pub username: String,

    /// Password for ticket login
    pub password: Option<SecretString>,

    /// API token id (the part after `!`)
    pub token_id: Option<String>,

    /// API token secret
    pub token_secret: Option<SecretString>,

    /// Optional pre-shared CSRF value sent with the login request
    pub csrf_pre_token: Option<String>,

    /// Explicit scheme; `None` selects automatically
    pub kind: Option<AuthKind>,
}

impl AuthConfig {
    /// Password (ticket) authentication.
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(SecretString::new(password.into().into_boxed_str())),
            kind: Some(AuthKind::Password),
            ..Default::default()
        }
    }

    /// API token authentication.
    pub fn token(
        username: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            token_id: Some(token_id.into()),
            token_secret: Some(SecretString::new(token_secret.into().into_boxed_str())),
            kind: Some(AuthKind::Token),
            ..Default::default()
        }
    }

    /// Send a pre-shared CSRF value with the login request.
    pub fn with_csrf_pre_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_pre_token = Some(token.into());
        self
    }

    /// Force a scheme instead of selecting it from the fields present.
    pub fn with_kind(mut self, kind: AuthKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// The scheme in effect.
    ///
    /// An explicit `kind` wins. Otherwise token auth is used when both the
    /// token id and secret are non-empty, password auth in every other case.
    pub fn resolved_kind(&self) -> AuthKind {
        use secrecy::ExposeSecret;

        if let Some(kind) = self.kind {
            return kind;
        }

        let has_id = self.token_id.as_deref().is_some_and(|id| !id.is_empty());
        let has_secret = self
            .token_secret
            .as_ref()
            .is_some_and(|s| !s.expose_secret().is_empty());

        if has_id && has_secret {
            AuthKind::Token
        } else {
            AuthKind::Password
        }
    }
}

/// Configuration for the Proxmox VE client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API host, e.g. `https://pve.example.com:8006/`
    pub base_url: Option<String>,

    /// Credentials
    pub auth: AuthConfig,

    /// Per-attempt request timeout
    pub timeout: Duration,

    /// Maximum number of transport-level retries
    pub max_retries: u32,

    /// `User-Agent` override
    pub user_agent: Option<String>,

    /// Skip TLS certificate verification.
    ///
    /// Unsafe outside of lab setups with self-signed certificates.
    pub danger_accept_invalid_certs: bool,

    /// Connection pool configuration
    pub connection_pool: ConnectionPoolConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            auth: AuthConfig::default(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            user_agent: None,
            danger_accept_invalid_certs: false,
            connection_pool: ConnectionPoolConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with the given credentials.
    pub fn with_auth(auth: AuthConfig) -> Self {
        Self {
            auth,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `PVE_BASE_URL` for the API host
    /// - `PVE_USERNAME`, `PVE_PASSWORD` for ticket login
    /// - `PVE_TOKEN_ID`, `PVE_TOKEN_SECRET` for API token auth
    /// - `PVE_CSRF_PRE_TOKEN` for the optional login CSRF value
    /// - `PVE_INSECURE_TLS` (`1`/`true`/`yes`) to skip certificate checks
    /// - `PVE_TIMEOUT` for request timeout (in seconds)
    /// - `PVE_MAX_RETRIES` for maximum retry attempts
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) when a numeric
    /// variable is set but does not parse.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, crate::error::Error> {
        use crate::error::Error;
        use std::env;

        let mut config = Self::default();

        if let Ok(base_url) = env::var("PVE_BASE_URL") {
            config.base_url = Some(base_url);
        }

        // Authentication
        if let Ok(username) = env::var("PVE_USERNAME") {
            config.auth.username = username;
        }
        if let Ok(password) = env::var("PVE_PASSWORD") {
            config.auth.password = Some(SecretString::new(password.into_boxed_str()));
        }
        if let Ok(token_id) = env::var("PVE_TOKEN_ID") {
            config.auth.token_id = Some(token_id);
        }
        if let Ok(secret) = env::var("PVE_TOKEN_SECRET") {
            config.auth.token_secret = Some(SecretString::new(secret.into_boxed_str()));
        }
        if let Ok(pre_token) = env::var("PVE_CSRF_PRE_TOKEN")
            && !pre_token.is_empty()
        {
            config.auth.csrf_pre_token = Some(pre_token);
        }

        if let Ok(insecure) = env::var("PVE_INSECURE_TLS") {
            config.danger_accept_invalid_certs = matches!(
                insecure.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes"
            );
        }

        // Timeout
        if let Ok(timeout_str) = env::var("PVE_TIMEOUT") {
            let secs = timeout_str
                .trim()
                .parse::<u64>()
                .map_err(|e| Error::Config(format!("PVE_TIMEOUT={timeout_str:?}: {e}")))?;
            config.timeout = Duration::from_secs(secs);
        }

        // Max retries
        if let Ok(max_retries_str) = env::var("PVE_MAX_RETRIES") {
            config.max_retries = max_retries_str.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!("PVE_MAX_RETRIES={max_retries_str:?}: {e}"))
            })?;
        }

        Ok(config)
    }

    /// Merge this configuration with another, with the other taking precedence.
    ///
    /// Fields of `other` still at their default value do not override.
    pub fn merge(mut self, other: ClientConfig) -> Self {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if !other.auth.username.is_empty() {
            self.auth.username = other.auth.username;
        }
        if other.auth.password.is_some() {
            self.auth.password = other.auth.password;
        }
        if other.auth.token_id.is_some() {
            self.auth.token_id = other.auth.token_id;
        }
        if other.auth.token_secret.is_some() {
            self.auth.token_secret = other.auth.token_secret;
        }
        if other.auth.csrf_pre_token.is_some() {
            self.auth.csrf_pre_token = other.auth.csrf_pre_token;
        }
        if other.auth.kind.is_some() {
            self.auth.kind = other.auth.kind;
        }
        if other.timeout != DEFAULT_TIMEOUT {
            self.timeout = other.timeout;
        }
        if other.max_retries != DEFAULT_MAX_RETRIES {
            self.max_retries = other.max_retries;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
        if other.danger_accept_invalid_certs {
            self.danger_accept_invalid_certs = true;
        }
        if other.rate_limit != RateLimitConfig::default() {
            self.rate_limit = other.rate_limit;
        }

        self
    }
}

/// Configuration for HTTP connection pooling.
#[derive(Debug, Clone)]
pub struct ConnectionPoolConfig {
    /// Maximum number of idle connections per host
    pub max_idle_per_host: usize,

    /// TCP connect timeout
    pub connect_timeout: Duration,
}

impl Default for ConnectionPoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 10,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for client-side rate limiting.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Steady request rate
    pub requests_per_second: f64,

    /// Requests allowed back to back before throttling kicks in
    pub burst: u32,

    /// Whether requests are throttled at all
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 10.0,
            burst: 1,
            enabled: true,
        }
    }
}

impl RateLimitConfig {
    /// Rate limit with the given steady rate and burst.
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            requests_per_second,
            burst,
            enabled: true,
        }
    }

    /// No client-side throttling.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Builder for creating ClientConfig with a fluent API.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
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

    /// Set the request timeout.
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

    /// Skip TLS certificate verification. Unsafe for production use.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.config.danger_accept_invalid_certs = accept;
        self
    }

    /// Set rate limiting configuration.
    pub fn rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Set connection pool configuration.
    pub fn connection_pool(mut self, pool: ConnectionPoolConfig) -> Self {
        self.config.connection_pool = pool;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
