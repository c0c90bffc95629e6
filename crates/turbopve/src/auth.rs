//! Session state and authentication
//!
//! Credentials are established lazily on the first request and kept in a
//! [`SessionState`] behind one async mutex. Logging in, reading the
//! credentials and the invalidate-then-login sequence all happen under that
//! lock, so concurrent first use performs a single login and a stale
//! session is replaced only once.

use crate::config::{AuthConfig, AuthKind};
use crate::error::{Error, Result};
use crate::types::Ticket;
use bytes::Bytes;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, USER_AGENT};
use http::{HeaderMap, HeaderValue, Method};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use turbopve_core::cancel::Context;
use turbopve_transport::{HttpRequest, Transport};
use url::Url;

/// Name of the session cookie carrying the login ticket.
pub const AUTH_COOKIE_NAME: &str = "PVEAuthCookie";

/// Header carrying the CSRF prevention token on mutating requests.
pub const CSRF_HEADER: &str = "CSRFPreventionToken";

/// Scheme prefix of the `Authorization` header for API tokens.
pub const TOKEN_SCHEME: &str = "PVEAPIToken";

/// Authentication state of a client.
///
/// Either the cookie and CSRF token are set together (ticket login) or the
/// static token is set (API token), never a mix.
#[derive(Clone, Default)]
pub struct SessionState {
    cookie: Option<String>,
    csrf_token: Option<String>,
    static_token: Option<String>,
    generation: u64,
}

impl SessionState {
    /// `Cookie` header value, e.g. `PVEAuthCookie=<ticket>`.
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// CSRF prevention token issued with the ticket.
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Full `Authorization` header value for token auth.
    pub fn static_token(&self) -> Option<&str> {
        self.static_token.as_deref()
    }

    /// Incremented on every successful (re)authentication.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether credentials are present.
    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some() || self.static_token.is_some()
    }

    fn set_session(&mut self, ticket: &str, csrf_token: &str) {
        self.cookie = Some(format!("{AUTH_COOKIE_NAME}={ticket}"));
        self.csrf_token = Some(csrf_token.to_string());
        self.static_token = None;
        self.generation += 1;
    }

    fn set_token(&mut self, token: String) {
        self.cookie = None;
        self.csrf_token = None;
        self.static_token = Some(token);
        self.generation += 1;
    }

    fn clear(&mut self) {
        self.cookie = None;
        self.csrf_token = None;
        self.static_token = None;
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SessionState")
            .field("cookie", &redact(&self.cookie))
            .field("csrf_token", &redact(&self.csrf_token))
            .field("static_token", &redact(&self.static_token))
            .field("generation", &self.generation)
            .finish()
    }
}

/// Credential headers captured from the session for one attempt.
#[derive(Debug, Clone)]
pub(crate) struct Credentials {
    generation: u64,
    scheme: CredentialScheme,
}

#[derive(Debug, Clone)]
enum CredentialScheme {
    Session {
        cookie: HeaderValue,
        csrf: Option<HeaderValue>,
    },
    Token {
        authorization: HeaderValue,
    },
}

impl Credentials {
    fn from_state(state: &SessionState) -> Result<Self> {
        let scheme = match (&state.cookie, &state.static_token) {
            (Some(cookie), _) => CredentialScheme::Session {
                cookie: sensitive(cookie, "session cookie")?,
                csrf: match state.csrf_token.as_deref() {
                    Some(csrf) if !csrf.is_empty() => Some(sensitive(csrf, "CSRF token")?),
                    _ => None,
                },
            },
            (None, Some(token)) => CredentialScheme::Token {
                authorization: sensitive(token, "API token")?,
            },
            (None, None) => return Err(Error::Auth("no credentials available".to_string())),
        };
        Ok(Self {
            generation: state.generation,
            scheme,
        })
    }

    /// Whether these credentials came from a ticket login and may be renewed.
    pub(crate) fn is_session(&self) -> bool {
        matches!(self.scheme, CredentialScheme::Session { .. })
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Add the credential headers to `headers`. The CSRF token is only sent
    /// with state-changing requests.
    pub(crate) fn apply(&self, headers: &mut HeaderMap, mutating: bool) {
        match &self.scheme {
            CredentialScheme::Session { cookie, csrf } => {
                headers.insert(COOKIE, cookie.clone());
                if mutating && let Some(csrf) = csrf {
                    headers.insert(CSRF_HEADER, csrf.clone());
                }
            }
            CredentialScheme::Token { authorization } => {
                headers.insert(AUTHORIZATION, authorization.clone());
            }
        }
    }
}

fn sensitive(value: &str, what: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value)
        .map_err(|_| Error::Auth(format!("{what} is not a valid header value")))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Build the `Authorization` value for API token auth.
///
/// # Errors
///
/// [`Error::Config`] naming every missing field when the username, token id
/// or token secret is empty.
pub fn token_header(auth: &AuthConfig) -> Result<String> {
    let token_id = auth.token_id.as_deref().unwrap_or_default();
    let secret = auth
        .token_secret
        .as_ref()
        .map(|s| s.expose_secret())
        .unwrap_or_default();

    let missing: Vec<&str> = [
        ("username", auth.username.is_empty()),
        ("token id", token_id.is_empty()),
        ("token secret", secret.is_empty()),
    ]
    .into_iter()
    .filter_map(|(name, empty)| empty.then_some(name))
    .collect();

    if !missing.is_empty() {
        return Err(Error::Config(format!(
            "token authentication requires {}",
            missing.join(", ")
        )));
    }

    Ok(format!("{TOKEN_SCHEME}={}!{token_id}={secret}", auth.username))
}

/// Establishes and renews credentials.
pub(crate) struct Authenticator {
    config: AuthConfig,
    login_url: Url,
    user_agent: HeaderValue,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("username", &self.config.username)
            .field("kind", &self.config.resolved_kind())
            .field("login_url", &self.login_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub(crate) fn new(
        config: AuthConfig,
        login_url: Url,
        user_agent: HeaderValue,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            login_url,
            user_agent,
            transport,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// The scheme in effect.
    pub(crate) fn kind(&self) -> AuthKind {
        self.config.resolved_kind()
    }

    /// Snapshot of the current session.
    pub(crate) async fn session(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Current credentials, authenticating first if there are none.
    pub(crate) async fn credentials(&self, ctx: &Context) -> Result<Credentials> {
        let mut state = self.state.lock().await;
        if !state.is_authenticated() {
            self.authenticate_locked(&mut state, ctx).await?;
        }
        Credentials::from_state(&state)
    }

    /// Authenticate now, replacing any existing credentials.
    pub(crate) async fn authenticate(&self, ctx: &Context) -> Result<()> {
        let mut state = self.state.lock().await;
        self.authenticate_locked(&mut state, ctx).await
    }

    /// Replace credentials that the server rejected.
    ///
    /// `stale` is the generation the rejected request was sent with. If the
    /// session has moved on since, another caller already renewed it and the
    /// fresh credentials are reused as they are.
    pub(crate) async fn reauthenticate(&self, ctx: &Context, stale: u64) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.is_authenticated() && state.generation != stale {
            debug!(generation = state.generation, "Session already renewed");
            return Ok(());
        }
        state.clear();
        self.authenticate_locked(&mut state, ctx).await
    }

    /// Drop the current credentials; the next request logs in again.
    pub(crate) async fn invalidate(&self) {
        self.state.lock().await.clear();
    }

    async fn authenticate_locked(&self, state: &mut SessionState, ctx: &Context) -> Result<()> {
        match self.config.resolved_kind() {
            AuthKind::Token => {
                let token = token_header(&self.config)?;
                state.set_token(token);
                debug!(username = %self.config.username, "Using API token credentials");
            }
            AuthKind::Password => {
                let password = self.config.password.as_ref().ok_or_else(|| {
                    Error::Config("password authentication requires a password".to_string())
                })?;
                let ticket = self
                    .login(ctx, &self.config.username, password, self.config.csrf_pre_token.as_deref())
                    .await?;
                state.set_session(
                    &ticket.ticket,
                    ticket.csrf_prevention_token.as_deref().unwrap_or_default(),
                );
                info!(
                    username = %ticket.username,
                    generation = state.generation,
                    "Authenticated with ticket"
                );
            }
        }
        Ok(())
    }

    /// POST the credentials to the ticket endpoint.
    ///
    /// Does not touch the session state, so it also serves stateless logins.
    pub(crate) async fn login(
        &self,
        ctx: &Context,
        username: &str,
        password: &SecretString,
        csrf_pre_token: Option<&str>,
    ) -> Result<Ticket> {
        if username.is_empty() {
            return Err(Error::Config(
                "password authentication requires a username".to_string(),
            ));
        }

        let mut body = serde_json::json!({
            "username": username,
            "password": password.expose_secret(),
        });
        if let Some(pre_token) = csrf_pre_token.filter(|t| !t.is_empty()) {
            body["CSRFPreToken"] = serde_json::Value::from(pre_token);
        }
        let body = serde_json::to_vec(&body)
            .map_err(|e| Error::InvalidRequest(format!("login body: {e}")))?;

        let request = HttpRequest::new(Method::POST, self.login_url.clone())
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_header(ACCEPT, HeaderValue::from_static("application/json"))
            .with_header(USER_AGENT, self.user_agent.clone())
            .with_body(Bytes::from(body));

        debug!(username, url = %self.login_url, "Requesting ticket");
        let response = self.transport.send(request, ctx).await?;

        if !response.is_success() {
            let reason = Error::from_response(response.status, &response.body);
            warn!(username, status = response.status.as_u16(), "Login rejected");
            return Err(Error::Auth(format!("login rejected: {reason}")));
        }

        parse_ticket(&response.body)
    }
}

/// Extract the ticket from a login response body.
pub(crate) fn parse_ticket(body: &[u8]) -> Result<Ticket> {
    #[derive(serde::Deserialize)]
    struct LoginEnvelope {
        data: Option<LoginData>,
    }

    #[derive(serde::Deserialize)]
    struct LoginData {
        ticket: Option<String>,
        #[serde(rename = "CSRFPreventionToken")]
        csrf_prevention_token: Option<String>,
        username: Option<String>,
        clustername: Option<String>,
    }

    let envelope: LoginEnvelope = serde_json::from_slice(body)
        .map_err(|e| Error::Auth(format!("invalid authentication response: {e}")))?;
    let data = envelope
        .data
        .ok_or_else(|| Error::Auth("invalid authentication response: no data".to_string()))?;

    let ticket = data
        .ticket
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Auth("authentication response contains no ticket".to_string()))?;

    Ok(Ticket {
        ticket,
        csrf_prevention_token: data.csrf_prevention_token,
        username: data.username.unwrap_or_default(),
        cluster_name: data.clustername,
    })
}
