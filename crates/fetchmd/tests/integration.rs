//! Integration tests for fetchmd using wiremock
//!
//! The validator only admits https URLs on public addresses, while the mock
//! server listens on plain http at 127.0.0.1. `MockRoute` bridges the two:
//! it sends each validated request to the mock server, keeping path and
//! query, through the real reqwest transport.

use async_trait::async_trait;
use fetchmd::{
    DnsResolver, Error, FetchBudget, FetchClient, FetchError, HopRequest, HopResponse,
    ReqwestTransport, SecurityError, Transport, TransportError,
};
use std::io;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct PublicResolver;

#[async_trait]
impl DnsResolver for PublicResolver {
    async fn lookup(&self, _hostname: &str) -> io::Result<IpAddr> {
        Ok(IpAddr::from([93, 184, 216, 34]))
    }
}

struct MockRoute {
    base: Url,
    inner: ReqwestTransport,
}

#[async_trait]
impl Transport for MockRoute {
    async fn send(&self, request: HopRequest) -> Result<HopResponse, TransportError> {
        let mut url = self.base.clone();
        url.set_path(request.url.path());
        url.set_query(request.url.query());
        self.inner
            .send(HopRequest {
                url,
                pinned_addr: None,
            })
            .await
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client_for(server: &MockServer) -> FetchClient {
    init_tracing();
    FetchClient::builder()
        .transport(MockRoute {
            base: Url::parse(&server.uri()).unwrap(),
            inner: ReqwestTransport::new(),
        })
        .resolver(PublicResolver)
        .build()
}

#[tokio::test]
async fn test_simple_get() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><body>Hello, World!</body></html>", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let html = client_for(&mock_server)
        .fetch("https://example.com/")
        .await
        .unwrap();
    assert_eq!(html, "<html><body>Hello, World!</body></html>");
}

#[tokio::test]
async fn test_sends_identifying_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", fetchmd::DEFAULT_USER_AGENT))
        .and(|req: &wiremock::Request| {
            req.headers.get("accept").and_then(|v| v.to_str().ok())
                == Some("text/html,application/xhtml+xml")
        })
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let html = client_for(&mock_server)
        .fetch("https://example.com/")
        .await
        .unwrap();
    assert_eq!(html, "<p>ok</p>");
}

#[tokio::test]
async fn test_transport_does_not_follow_redirects() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/elsewhere"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/elsewhere"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/start", mock_server.uri())).unwrap();
    let response = ReqwestTransport::new()
        .send(HopRequest {
            url,
            pinned_addr: None,
        })
        .await
        .unwrap();

    assert_eq!(response.status, 302);
    assert_eq!(response.headers.get("location").unwrap(), "/elsewhere");
}

fn pinned_target(server: &MockServer) -> Url {
    let port = server.address().port();
    Url::parse(&format!("http://pinned.invalid:{}/pinned", port)).unwrap()
}

#[tokio::test]
async fn test_pinned_hop_connects_to_approved_address() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/pinned"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>pinned</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = ReqwestTransport::new()
        .send(HopRequest {
            url: pinned_target(&mock_server),
            pinned_addr: Some(IpAddr::from([127, 0, 0, 1])),
        })
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_unpinned_hop_resolves_hostname_itself() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = ReqwestTransport::new()
        .send(HopRequest {
            url: pinned_target(&mock_server),
            pinned_addr: None,
        })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_custom_user_agent_is_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "docs-bot/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>ok</p>", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let url = Url::parse(&format!("{}/", mock_server.uri())).unwrap();
    let response = ReqwestTransport::new()
        .with_user_agent("docs-bot/2.0")
        .send(HopRequest {
            url,
            pinned_addr: None,
        })
        .await
        .unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_follows_revalidated_redirect_chain() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "https://www.example.com/mid"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mid"))
        .respond_with(ResponseTemplate::new(307).insert_header("location", "/new?page=2"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<h1>Moved here</h1>", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let html = client_for(&mock_server)
        .fetch("https://example.com/old")
        .await
        .unwrap();
    assert_eq!(html, "<h1>Moved here</h1>");
}

#[tokio::test]
async fn test_redirect_to_private_address_is_not_contacted() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "https://169.254.169.254/latest"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("secret", "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch("https://example.com/")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Security(SecurityError::PrivateAddress(_))
    ));
}

#[tokio::test]
async fn test_redirect_loop_is_cut_off() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", "https://example.com/loop"),
        )
        .expect(6)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch("https://example.com/loop")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Too many redirects"));
}

#[tokio::test]
async fn test_http_error_statuses() {
    let mock_server = MockServer::start().await;

    for (status, route) in [(403u16, "/forbidden"), (404, "/missing"), (500, "/broken")] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_raw("<p>no</p>", "text/html"))
            .mount(&mock_server)
            .await;
    }

    let client = client_for(&mock_server);

    let err = client.fetch("https://example.com/forbidden").await.unwrap_err();
    assert_eq!(err.to_string(), "Access denied");
    assert_eq!(err.status_code(), Some(403));

    let err = client.fetch("https://example.com/missing").await.unwrap_err();
    assert_eq!(err.to_string(), "Page not found");
    assert_eq!(err.status_code(), Some(404));

    let err = client.fetch("https://example.com/broken").await.unwrap_err();
    assert!(err.to_string().contains("Server error"));
    assert_eq!(err.status_code(), Some(500));
}

#[tokio::test]
async fn test_json_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"{"key": "value"}"#, "application/json"),
        )
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch("https://example.com/api")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Fetch(FetchError::NotHtml(_))));
    assert!(err.to_string().contains("application/json"));
}

#[tokio::test]
async fn test_size_ceiling() {
    let mock_server = MockServer::start().await;

    let body = "x".repeat(4096);
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.clone(), "text/html"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);

    let exact = FetchBudget::default().with_max_bytes(4096);
    let html = client
        .fetch_with_budget("https://example.com/", &exact)
        .await
        .unwrap();
    assert_eq!(html.len(), 4096);

    let short = FetchBudget::default().with_max_bytes(4095);
    let err = client
        .fetch_with_budget("https://example.com/", &short)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Fetch(FetchError::TooLarge { limit: 4095, .. })
    ));
}

#[tokio::test]
async fn test_slow_response_times_out_repeatedly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>late</p>", "text/html")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let budget = FetchBudget::default().with_timeout_ms(50);

    for _ in 0..3 {
        let err = client
            .fetch_with_budget("https://example.com/slow", &budget)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Request timed out after 50ms");
    }
}

#[tokio::test]
async fn test_plain_http_never_reaches_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>x</p>", "text/html"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .fetch(&format!("{}/", mock_server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Security(SecurityError::SchemeNotAllowed(_))
    ));
}
