//! Error classification, throttling and cancellation against a mock server

mod common;

use assert_matches::assert_matches;
use common::{api_path, data, hits};
use http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;
use std::time::{Duration, Instant};
use turbopve::{Cancelled, Client, Context, Error, RateLimitConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn throttled_client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .token("root@pam", "ci", "secret")
        .rate_limit(RateLimitConfig::new(1.0, 1))
        .max_retries(0)
        .build()
        .expect("Failed to build client")
}

async fn mount_version(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(api_path("version")))
        .respond_with(data(json!({"version": "8.2.4", "release": "8.2"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_error_list_becomes_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(api_path("nodes/pve1/vzdump")))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"errors": ["field X is required"], "data": null})),
        )
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let error = client
        .nodes()
        .vzdump("pve1", &Default::default())
        .await
        .expect_err("should fail");

    match &error {
        Error::Api { status, messages, .. } => {
            assert_eq!(*status, StatusCode::BAD_REQUEST);
            assert_eq!(messages, &vec!["field X is required".to_string()]);
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
    assert!(!error.is_retryable());
}

#[tokio::test]
async fn test_parameter_errors_name_the_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("nodes/pve1/syslog")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": {"limit": "value must have a minimum value of 0\n"},
            "data": null
        })))
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let error = client.nodes().syslog("pve1", 10).await.expect_err("should fail");

    assert_eq!(
        error.messages(),
        &["limit: value must have a minimum value of 0".to_string()]
    );
}

#[tokio::test]
async fn test_unparseable_error_keeps_raw_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("cluster/status")))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>proxy error</html>"))
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let result = client.cluster().status().await;

    assert_matches!(
        result,
        Err(Error::Api { status, messages, body })
            if status == StatusCode::INTERNAL_SERVER_ERROR
                && messages.is_empty()
                && body == "<html>proxy error</html>"
    );
}

#[tokio::test]
async fn test_unexpected_shape_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("nodes")))
        .respond_with(data(json!({"not": "a list"})))
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let result = client.nodes().list().await;

    assert_matches!(result, Err(Error::Decode { .. }));
}

#[tokio::test]
async fn test_not_found_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("nodes/ghost/status")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"data": null})))
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let error = client.nodes().status("ghost").await.expect_err("should fail");

    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_rate_limit_spaces_requests() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let client = throttled_client(&server);
    let start = Instant::now();
    client.version().get().await.expect("first call");
    client.version().get().await.expect("second call");

    assert!(
        start.elapsed() >= Duration::from_millis(900),
        "second request was not throttled: {:?}",
        start.elapsed()
    );
    assert_eq!(hits(&server, "version").await, 2);
}

#[tokio::test]
async fn test_deadline_during_rate_limit_wait() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let client = throttled_client(&server);
    client.version().get().await.expect("first call");

    let result = client
        .with_timeout(Duration::from_millis(100))
        .version()
        .get()
        .await;

    assert_matches!(result, Err(Error::Cancelled(Cancelled::DeadlineExceeded)));
    assert_eq!(hits(&server, "version").await, 1);
}

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let server = MockServer::start().await;
    mount_version(&server).await;

    let (ctx, handle) = Context::cancellable();
    handle.cancel();

    let client = common::token_client(&server).with_context(ctx);
    let result = client.version().get().await;

    assert_matches!(result, Err(Error::Cancelled(Cancelled::Cancelled)));
    assert_eq!(hits(&server, "version").await, 0);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = Client::builder()
        .base_url(format!("http://{addr}"))
        .token("root@pam", "ci", "secret")
        .rate_limit(RateLimitConfig::disabled())
        .max_retries(0)
        .build()
        .expect("Failed to build client");

    let result = client.version().get().await;
    assert_matches!(result, Err(Error::Transport(_)));
}

#[rstest]
#[case(400, false)]
#[case(403, false)]
#[case(404, false)]
#[case(429, true)]
#[case(500, false)]
#[case(502, true)]
#[case(503, true)]
#[case(595, false)]
#[tokio::test]
async fn test_error_status_codes(#[case] status: u16, #[case] retryable: bool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api_path("cluster/resources")))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_json(json!({"data": null, "message": "request failed"})),
        )
        .mount(&server)
        .await;

    let client = common::token_client(&server);
    let error = client.cluster().resources(None).await.expect_err("should fail");

    assert_eq!(error.status().map(|s| s.as_u16()), Some(status));
    assert_eq!(error.messages(), &["request failed".to_string()]);
    assert_eq!(error.is_retryable(), retryable);
}
