//! Integration tests for per-account proxy routing
//!
//! A configured proxy must be honored or the test must fail; the request is
//! never silently sent over a direct connection.

use relayprobe::account::{Account, ConfigAccountStore, ProxyConfig};
use relayprobe::probe::{
    ConnectionTester, FailureReason, HttpStreamSender, ProxyTransportResolver, SenderSettings,
    TransportResolver,
};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

fn tester(account: Account) -> ConnectionTester {
    let settings = SenderSettings {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        ..SenderSettings::default()
    };
    ConnectionTester::new(
        Arc::new(ConfigAccountStore::new(vec![account])),
        Arc::new(HttpStreamSender::new(settings)),
    )
}

async fn upstream_expecting_no_calls() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("data: {}\n\n"))
        .expect(0)
        .mount(&server)
        .await;
    server
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

#[tokio::test]
async fn test_unsupported_proxy_scheme_fails_before_network() {
    let upstream = upstream_expecting_no_calls().await;
    let account = Account::new("a", "A", upstream.uri(), "k")
        .with_proxy(ProxyConfig::new("gopher", "proxy.local", 70));

    let outcome = tester(account).test_connection("a", "claude-sonnet-4-6").await;

    assert_eq!(outcome.failure(), Some(FailureReason::ProxyConfiguration));
    assert!(outcome.error().unwrap().contains("gopher"));
    upstream.verify().await;
}

#[tokio::test]
async fn test_empty_proxy_host_fails_before_network() {
    let upstream = upstream_expecting_no_calls().await;
    let account = Account::new("a", "A", upstream.uri(), "k")
        .with_proxy(ProxyConfig::new("http", "  ", 8080));

    let outcome = tester(account).test_connection("a", "claude-sonnet-4-6").await;

    assert_eq!(outcome.failure(), Some(FailureReason::ProxyConfiguration));
    upstream.verify().await;
}

#[tokio::test]
async fn test_unreachable_http_proxy_does_not_fall_back_to_direct() {
    let upstream = upstream_expecting_no_calls().await;
    let account = Account::new("a", "A", upstream.uri(), "k")
        .with_proxy(ProxyConfig::new("http", "127.0.0.1", closed_port()));

    let outcome = tester(account).test_connection("a", "claude-sonnet-4-6").await;

    assert!(!outcome.success());
    assert_eq!(outcome.failure(), Some(FailureReason::UpstreamConnect));
    upstream.verify().await;
}

#[tokio::test]
async fn test_unreachable_socks_proxy_does_not_fall_back_to_direct() {
    let upstream = upstream_expecting_no_calls().await;
    let account = Account::new("a", "A", upstream.uri(), "k")
        .with_proxy(ProxyConfig::new("socks5", "127.0.0.1", closed_port()));

    let outcome = tester(account).test_connection("a", "claude-sonnet-4-6").await;

    assert!(!outcome.success());
    upstream.verify().await;
}

#[tokio::test]
async fn test_proxy_password_never_appears_in_outcome() {
    let upstream = upstream_expecting_no_calls().await;
    let account = Account::new("a", "A", upstream.uri(), "k").with_proxy(
        ProxyConfig::new("http", "127.0.0.1", closed_port())
            .with_credentials("proxyuser", "pr0xy-pa55"),
    );

    let outcome = tester(account).test_connection("a", "claude-sonnet-4-6").await;

    let json = serde_json::to_string(&outcome).unwrap();
    assert!(!json.contains("pr0xy-pa55"), "outcome leaked password: {}", json);
}

#[test]
fn test_resolver_labels_never_include_credentials() {
    let proxy = ProxyConfig::new("socks5h", "10.0.0.1", 1080).with_credentials("u", "secret");
    let transport = ProxyTransportResolver
        .resolve(Some(&proxy))
        .expect("socks5h proxy should resolve");

    assert!(!transport.is_direct());
    assert_eq!(transport.label(), "socks5h://10.0.0.1:1080");
    assert!(!format!("{:?}", transport).contains("secret"));
}

#[test]
fn test_resolver_without_proxy_is_direct() {
    let transport = ProxyTransportResolver.resolve(None).unwrap();
    assert!(transport.is_direct());
}
