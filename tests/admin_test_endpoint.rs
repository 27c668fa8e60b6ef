//! End-to-end tests for POST /admin/claude-console-accounts/{account_id}/test
//!
//! Drives the full router with `oneshot` against a wiremock upstream.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use relayprobe::config::Config;
use relayprobe::handlers::{self, AppState};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const SSE_START: &str = "event: message_start\n\
data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\"}}\n\n\
event: content_block_start\n\
data: {\"type\":\"content_block_start\",\"index\":0}\n\n";

fn create_test_config(upstream_url: &str) -> Config {
    let toml = format!(
        r#"
[server]
host = "127.0.0.1"
port = 3000

[probe]
timeout_ms = 5000
connect_timeout_ms = 2000

[[accounts]]
id = "console-a"
name = "Console A"
api_url = "{upstream_url}"
api_key = "sk-ant-api03-secret-value"

[[accounts]]
id = "relay-b"
name = "Relay B"
api_url = "{upstream_url}"
api_key = "relay-secret-token"
"#
    );
    toml::from_str(&toml).expect("should parse test config")
}

fn create_test_app(config: Config) -> Router {
    let state = AppState::new(Arc::new(config)).expect("AppState::new should succeed");
    handlers::router(state)
}

fn test_request(account_id: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!(
            "/admin/claude-console-accounts/{}/test",
            account_id
        ))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("response should be JSON")
}

async fn mount_streaming_upstream(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(SSE_START),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_successful_test_returns_success_and_account_id() {
    let upstream = MockServer::start().await;
    mount_streaming_upstream(&upstream).await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .oneshot(test_request("console-a", r#"{"model":"claude-sonnet-4-6"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = response_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({"success": true, "accountId": "console-a"})
    );
}

#[tokio::test]
async fn test_missing_model_is_rejected_without_upstream_call() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SSE_START))
        .expect(0)
        .mount(&upstream)
        .await;

    for body in ["", "{}", r#"{"model":""}"#, r#"{"model":"   "}"#, r#"{"model":7}"#] {
        let app = create_test_app(create_test_config(&upstream.uri()));
        let response = app.oneshot(test_request("console-a", body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let json = response_json(response).await;
        assert_eq!(json, serde_json::json!({"error": "model is required"}));
    }

    upstream.verify().await;
}

#[tokio::test]
async fn test_missing_model_is_rejected_even_for_unknown_account() {
    let upstream = MockServer::start().await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app.oneshot(test_request("nope", "{}")).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_json_body_is_rejected() {
    let upstream = MockServer::start().await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .oneshot(test_request("console-a", "model=claude-sonnet-4-6"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(
        json,
        serde_json::json!({"error": "request body must be valid JSON"})
    );
}

#[tokio::test]
async fn test_unknown_account_returns_404_outcome() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .oneshot(test_request("ghost", r#"{"model":"claude-sonnet-4-6"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["accountId"], "ghost");
    assert!(json["error"].as_str().unwrap().contains("ghost"));
    upstream.verify().await;
}

#[tokio::test]
async fn test_upstream_rejection_is_reported_without_leaking_key() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_string(
            r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key sk-ant-api03-secret-value"}}"#,
        ))
        .mount(&upstream)
        .await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .oneshot(test_request("console-a", r#"{"model":"claude-sonnet-4-6"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("401"), "error should name the status: {}", error);
    assert!(error.contains("authentication_error"));
    assert!(!error.contains("sk-ant-api03-secret-value"));
    assert!(error.contains("[REDACTED]"));
}

#[tokio::test]
async fn test_non_success_status_returns_502_with_body_excerpt() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_string(
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ))
        .mount(&upstream)
        .await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .oneshot(test_request("relay-b", r#"{"model":"claude-opus-4-6"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    let error = json["error"].as_str().unwrap();
    assert!(error.contains("529"));
    assert!(error.contains("Overloaded"));
}

#[tokio::test]
async fn test_connection_refused_returns_502() {
    // Bind then drop a listener to get a port with nothing behind it
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = create_test_app(create_test_config(&format!("http://{}", addr)));
    let response = app
        .oneshot(test_request("console-a", r#"{"model":"claude-sonnet-4-6"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = response_json(response).await;
    assert!(
        json["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to connect to upstream")
    );
}

#[tokio::test]
async fn test_successful_test_is_counted_in_metrics() {
    let upstream = MockServer::start().await;
    mount_streaming_upstream(&upstream).await;
    let app = create_test_app(create_test_config(&upstream.uri()));

    let response = app
        .clone()
        .oneshot(test_request("relay-b", r#"{"model":"claude-sonnet-4-6"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let metrics = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = axum::body::to_bytes(metrics.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains(
        "relayprobe_connection_tests_total{auth_scheme=\"bearer\",outcome=\"succeeded\"} 1"
    ));
}
