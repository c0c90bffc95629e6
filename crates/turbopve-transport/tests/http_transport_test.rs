//! Integration tests for HTTP transport

use http::{Method, StatusCode};
use rstest::rstest;
use std::time::Duration;
use turbopve_core::cancel::{Cancelled, Context};
use turbopve_core::retry::BackoffStrategy;
use turbopve_transport::http::RetryPolicy;
use turbopve_transport::{HttpRequest, HttpTransport, HttpTransportConfig, Transport, TransportError};
use url::Url;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_transport(max_retries: u32) -> HttpTransport {
    let config = HttpTransportConfig {
        timeout: Duration::from_secs(5),
        retry_policy: RetryPolicy::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(5))
            .jitter(0.0)
            .build(),
        ..Default::default()
    };
    HttpTransport::with_config(config).expect("Failed to create HTTP transport")
}

fn url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).unwrap()
}

#[tokio::test]
async fn test_send_passes_headers_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/start"))
        .and(header("CSRFPreventionToken", "csrf"))
        .and(body_string("{\"timeout\":30}"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"data\":\"UPID\"}"))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::new(
        Method::POST,
        url(&server, "/api2/json/nodes/pve1/qemu/100/status/start"),
    )
    .try_header("CSRFPreventionToken", "csrf")
    .unwrap()
    .with_body("{\"timeout\":30}");

    let response = fast_transport(0)
        .send(request, &Context::background())
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.attempts, 1);
    assert_eq!(response.text(), "{\"data\":\"UPID\"}");
}

#[tokio::test]
async fn test_error_status_is_not_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, url(&server, "/api2/json/version"));
    let response = fast_transport(3)
        .send(request, &Context::background())
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), "boom");
}

#[tokio::test]
async fn test_idempotent_request_not_retried_on_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(503).set_body_string("{\"data\":null}"))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::new(Method::GET, url(&server, "/api2/json/version"));
    let response = fast_transport(3)
        .send(request, &Context::background())
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.attempts, 1);
}

#[rstest]
#[case(Method::GET, 429)]
#[case(Method::GET, 502)]
#[case(Method::GET, 504)]
#[case(Method::POST, 503)]
#[case(Method::DELETE, 502)]
#[tokio::test]
async fn test_error_status_returned_after_single_attempt(
    #[case] verb: Method,
    #[case] status: u16,
) {
    let server = MockServer::start().await;
    Mock::given(method(verb.as_str()))
        .and(path("/api2/json/cluster/status"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;

    let request = HttpRequest::new(verb, url(&server, "/api2/json/cluster/status"));
    let response = fast_transport(2)
        .send(request, &Context::background())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), status);
    assert_eq!(response.attempts, 1);
}

#[tokio::test]
async fn test_connection_refused_is_connection_error() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let request = HttpRequest::new(
        Method::GET,
        Url::parse(&format!("http://127.0.0.1:{port}/api2/json/version")).unwrap(),
    );

    let err = fast_transport(1)
        .send(request, &Context::background())
        .await
        .unwrap_err();

    assert!(err.is_connection(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_cancelled_context_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (ctx, handle) = Context::cancellable();
    handle.cancel();

    let request = HttpRequest::new(Method::GET, url(&server, "/api2/json/version"));
    let err = fast_transport(3).send(request, &ctx).await.unwrap_err();

    assert!(matches!(err, TransportError::Cancelled(Cancelled::Cancelled)));
}

#[test]
fn test_retry_policy_default() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_retries(), 3);

    // 1s ±10% jitter before the first retry
    let delay_0 = policy.calculate_delay(0);
    assert!(delay_0 >= Duration::from_millis(900));
    assert!(delay_0 <= Duration::from_millis(1100));

    // Never above the 30s cap
    assert!(policy.calculate_delay(2) <= Duration::from_secs(30));
}
