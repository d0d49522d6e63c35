//! Integration tests for the request executor.
//!
//! These tests verify that the RequestExecutor:
//! - Retries 5xx, 429 and transport failures per the back-off schedule
//! - Surfaces RequestFailed once the schedule is exhausted
//! - Fails immediately on other 4xx statuses
//! - Sends pagination URLs verbatim and attaches credentials

use std::time::Duration;

use apiforge_core::{ApiError, Authorization, RequestExecutor, RequestSpec, RetryPolicy, Secret};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

/// Helper to build a policy with `retries` millisecond delays.
fn fast_policy(retries: usize) -> RetryPolicy {
    RetryPolicy::default().with_backoff(vec![Duration::from_millis(10); retries])
}

async fn mount_failures(server: &MockServer, status: u16, times: u64) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .up_to_n_times(times)
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_success(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2, 3]})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_success_on_first_attempt() {
    let server = MockServer::start().await;
    mount_success(&server).await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(2)).unwrap();
    let value = executor.execute(&RequestSpec::get("/items")).await.unwrap();

    assert_eq!(value, json!({"items": [1, 2, 3]}));
}

#[tokio::test]
async fn test_three_server_errors_then_success_with_three_retries() {
    let server = MockServer::start().await;
    mount_failures(&server, 500, 3).await;
    mount_success(&server).await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(3)).unwrap();
    let value = executor.execute(&RequestSpec::get("/items")).await.unwrap();

    assert_eq!(value["items"], json!([1, 2, 3]));
}

#[tokio::test]
async fn test_three_server_errors_exhaust_two_retries() {
    let server = MockServer::start().await;
    mount_failures(&server, 500, 3).await;
    mount_success(&server).await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(2)).unwrap();
    let result = executor.execute(&RequestSpec::get("/items")).await;

    match result {
        Err(ApiError::RequestFailed {
            status,
            body,
            attempts,
        }) => {
            assert_eq!(status, Some(500));
            assert_eq!(body, "upstream unavailable");
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    mount_failures(&server, 429, 1).await;
    mount_success(&server).await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(1)).unwrap();
    assert!(executor.execute(&RequestSpec::get("/items")).await.is_ok());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "not found"})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(3)).unwrap();
    let result = executor.execute(&RequestSpec::get("/items")).await;

    match result {
        Err(ApiError::RequestFailed {
            status, attempts, ..
        }) => {
            assert_eq!(status, Some(404));
            assert_eq!(attempts, 1);
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_custom_retry_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let policy = fast_policy(3).with_retry_statuses(vec![503]);
    let executor = RequestExecutor::new(server.uri(), policy).unwrap();
    let result = executor.execute(&RequestSpec::get("/items")).await;

    assert!(matches!(
        result,
        Err(ApiError::RequestFailed { attempts: 1, .. })
    ));
}

#[tokio::test]
async fn test_transport_failure_is_retried_then_surfaced() {
    // Nothing listens on a port whose listener was just dropped
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let executor = RequestExecutor::new(uri, fast_policy(2)).unwrap();
    let result = executor.execute(&RequestSpec::get("/items")).await;

    match result {
        Err(ApiError::RequestFailed {
            status, attempts, ..
        }) => {
            assert_eq!(status, None);
            assert_eq!(attempts, 3);
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_empty_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/events"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(0)).unwrap();
    let value = executor
        .execute(&RequestSpec::post("/events").with_json(json!({"type": "signup"})))
        .await
        .unwrap();

    assert!(value.is_null());
}

#[tokio::test]
async fn test_non_json_success_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(0)).unwrap();
    let result = executor.execute(&RequestSpec::get("/items")).await;

    assert!(matches!(result, Err(ApiError::Decode(_))));
}

#[tokio::test]
async fn test_next_page_url_is_used_verbatim() {
    let api = MockServer::start().await;
    let pages = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/page/2"))
        .and(query_param("$skiptoken", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"page": 2})))
        .expect(1)
        .mount(&pages)
        .await;

    let executor = RequestExecutor::new(api.uri(), fast_policy(0)).unwrap();
    let spec = RequestSpec::get("/search?q=x")
        .with_next_page_url(Some(format!("{}/page/2?$skiptoken=abc", pages.uri())));

    let value = executor.execute(&spec).await.unwrap();
    assert_eq!(value, json!({"page": 2}));
}

#[tokio::test]
async fn test_authorization_and_body_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-token"))
        .and(body_json(json!({"channel": "C1", "text": "hi"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(0)).unwrap();
    let spec = RequestSpec::post("/chat.postMessage")
        .with_json(json!({"channel": "C1", "text": "hi"}))
        .with_authorization(Authorization::Token {
            token_type: "Bearer".to_string(),
            token: Secret::new("xoxb-token"),
        });

    assert_eq!(executor.execute(&spec).await.unwrap(), json!({"ok": true}));
}

#[tokio::test]
async fn test_api_key_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/lists"))
        .and(header("x-api-key", "key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let executor = RequestExecutor::new(server.uri(), fast_policy(0)).unwrap();
    let spec = RequestSpec::get("/lists").with_authorization(Authorization::ApiKey {
        header: "X-Api-Key".to_string(),
        key: Secret::new("key-1"),
    });

    assert_eq!(executor.execute(&spec).await.unwrap(), json!([]));
}
