//! Request execution pipeline
//!
//! Every API call goes through [`Executor::execute`]: rate limit, lazy
//! authentication, credential headers, one transport call, and at most one
//! re-authentication when a ticket session is rejected with 401.

use crate::auth::Authenticator;
use crate::error::{Error, Result};
use crate::http::request::PendingRequest;
use crate::http::response::RawResponse;
use crate::observability::ApiCall;
use crate::ratelimit::RateLimiter;
use http::header::USER_AGENT;
use http::{HeaderValue, StatusCode};
use std::sync::Arc;
use tracing::warn;
use turbopve_core::cancel::Context;
use turbopve_transport::{HttpRequest, Transport};

/// Re-authentications allowed per logical request.
const MAX_REAUTH_ATTEMPTS: u32 = 1;

pub(crate) struct Executor {
    transport: Arc<dyn Transport>,
    limiter: Option<Arc<dyn RateLimiter>>,
    auth: Arc<Authenticator>,
    user_agent: HeaderValue,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("transport", &self.transport)
            .field("limiter", &self.limiter)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Executor {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        limiter: Option<Arc<dyn RateLimiter>>,
        auth: Arc<Authenticator>,
        user_agent: HeaderValue,
    ) -> Self {
        Self {
            transport,
            limiter,
            auth,
            user_agent,
        }
    }

    pub(crate) fn auth(&self) -> &Authenticator {
        &self.auth
    }

    /// Execute `request` and return the response whatever its status.
    ///
    /// Transport failures and cancellation are errors; a non-2xx status is
    /// not. A 401 under ticket auth renews the session and resends once; if
    /// the renewal fails the original 401 is returned, and a second 401 is
    /// [`Error::Auth`].
    pub(crate) async fn execute(&self, request: &PendingRequest, ctx: &Context) -> Result<RawResponse> {
        let mut call = ApiCall::new(request.method().clone(), request.path(), self.auth.kind());
        if let Some(body) = request.body() {
            call = call.with_body_size(body.len());
        }

        loop {
            ctx.check()?;
            if let Some(limiter) = &self.limiter {
                limiter.wait(ctx).await?;
            }

            let credentials = self.auth.credentials(ctx).await?;
            let mut http_request = HttpRequest::new(request.method().clone(), request.url().clone());
            http_request.headers = request.headers().clone();
            http_request.headers.insert(USER_AGENT, self.user_agent.clone());
            credentials.apply(&mut http_request.headers, request.is_mutating());
            http_request.body = request.body().cloned();

            call.log_attempt();
            let response: RawResponse = match self.transport.send(http_request, ctx).await {
                Ok(response) => response.into(),
                Err(err) => {
                    call.log_undelivered(&err);
                    return Err(err.into());
                }
            };

            if response.status() == StatusCode::UNAUTHORIZED && credentials.is_session() {
                if call.reauths >= MAX_REAUTH_ATTEMPTS {
                    log_response(&call, &response);
                    return Err(Error::Auth(format!(
                        "{} {} still unauthorized after re-authentication",
                        request.method(),
                        request.path()
                    )));
                }

                call.record_reauth();
                match self.auth.reauthenticate(ctx, credentials.generation()).await {
                    Ok(()) => continue,
                    Err(Error::Cancelled(reason)) => return Err(Error::Cancelled(reason)),
                    Err(err) => {
                        warn!(error = %err, "Re-authentication failed, returning original response");
                        log_response(&call, &response);
                        return Ok(response);
                    }
                }
            }

            log_response(&call, &response);
            return Ok(response);
        }
    }
}

fn log_response(call: &ApiCall, response: &RawResponse) {
    call.log_response(response.status(), response.bytes().len(), response.attempts());
}
