//! Common test utilities and helpers

use serde_json::{Value, json};
use turbopve::{Client, RateLimitConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Ticket returned by [`mount_login`].
#[allow(dead_code)]
pub const TEST_TICKET: &str = "PVE:root@pam:66F1A2B3::c2lnbmF0dXJl";

/// CSRF token returned by [`mount_login`].
#[allow(dead_code)]
pub const TEST_CSRF: &str = "66F1A2B3:Y3NyZi10b2tlbg";

/// Full path of an API endpoint on the mock server.
#[allow(dead_code)]
pub fn api_path(endpoint: &str) -> String {
    format!("/api2/json/{endpoint}")
}

/// A `{"data": ...}` success response.
#[allow(dead_code)]
pub fn data(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": value }))
}

/// Successful login response body.
#[allow(dead_code)]
pub fn login_body() -> Value {
    json!({
        "data": {
            "ticket": TEST_TICKET,
            "CSRFPreventionToken": TEST_CSRF,
            "username": "root@pam",
            "cap": {}
        }
    })
}

/// Accept every login on the mock server.
#[allow(dead_code)]
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(api_path("access/ticket")))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(server)
        .await;
}

/// Password-auth client against `server`, without throttling or transport
/// retries.
#[allow(dead_code)]
pub fn password_client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .password("root@pam", "secret")
        .rate_limit(RateLimitConfig::disabled())
        .max_retries(0)
        .build()
        .expect("Failed to build client")
}

/// Token-auth client against `server`, without throttling or transport
/// retries.
#[allow(dead_code)]
pub fn token_client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .token("root@pam", "ci", "5f0c2d6e-8b1a-4c3e-9f2d-7a6b5c4d3e2f")
        .rate_limit(RateLimitConfig::disabled())
        .max_retries(0)
        .build()
        .expect("Failed to build client")
}

/// Number of requests the server saw for `endpoint`.
#[allow(dead_code)]
pub async fn hits(server: &MockServer, endpoint: &str) -> usize {
    let full = api_path(endpoint);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() == full)
        .count()
}
