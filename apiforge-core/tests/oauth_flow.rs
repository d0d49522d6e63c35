//! Integration tests for the OAuth2 authorization code flow.
//!
//! These tests verify that the OAuth2Authenticator:
//! - Exchanges authorization codes against the token endpoint
//! - Refreshes credentials while keeping unrotated tokens
//! - Maps vendor rejections to the right error variants
//! - Sends client credentials in the body or as Basic auth

use apiforge_core::{
    ApiError, AuthConfig, ClientAuth, Credential, EndpointTable, OAuth2Authenticator, Secret,
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, header, method, path},
};

/// Helper to create an endpoint table pointing at the mock server.
fn create_test_endpoints(mock_server: &MockServer) -> EndpointTable {
    EndpointTable::new("test", "Test Vendor")
        .with_authorize_url(format!("{}/authorize", mock_server.uri()))
        .with_token_url(format!("{}/token", mock_server.uri()))
        .with_api_base_url(mock_server.uri())
}

fn create_test_config() -> AuthConfig {
    AuthConfig::new("client_id")
        .with_client_secret("client_secret")
        .with_redirect_uri("https://app.example.com/callback")
        .with_scope("offline_access User.Read")
}

fn authenticator(mock_server: &MockServer) -> OAuth2Authenticator {
    OAuth2Authenticator::new(create_test_config(), create_test_endpoints(mock_server)).unwrap()
}

#[tokio::test]
async fn test_exchange_code_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .and(body_string_contains("client_id=client_id"))
        .and(body_string_contains("client_secret=client_secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "id_token": "id-1",
            "expires_in": 3600,
            "scope": "offline_access User.Read"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credential = authenticator(&mock_server)
        .exchange_code("auth-code")
        .await
        .unwrap();

    assert_eq!(credential.access_token.expose(), "access-1");
    assert_eq!(credential.refresh_token, Some(Secret::new("refresh-1")));
    assert_eq!(credential.id_token, Some(Secret::new("id-1")));
    assert_eq!(credential.token_type, "Bearer");
    assert_eq!(credential.expires_in, Some(3600));
    assert!(!credential.is_expired());
}

#[tokio::test]
async fn test_exchange_code_string_expiry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "token_type": "bearer",
            "expires_in": "7200"
        })))
        .mount(&mock_server)
        .await;

    let credential = authenticator(&mock_server)
        .exchange_code("auth-code")
        .await
        .unwrap();

    assert_eq!(credential.token_type, "bearer");
    assert_eq!(credential.expires_in, Some(7200));
}

#[tokio::test]
async fn test_exchange_code_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70000: The provided authorization code is invalid"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = authenticator(&mock_server).exchange_code("bad-code").await;

    match result {
        Err(ApiError::AuthExchange { status, payload }) => {
            assert_eq!(status, 400);
            assert_eq!(payload["error"], "invalid_grant");
        }
        other => panic!("Expected AuthExchange, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exchange_code_rejected_in_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": false, "error": "invalid_code"})),
        )
        .mount(&mock_server)
        .await;

    let result = authenticator(&mock_server).exchange_code("bad-code").await;

    match result {
        Err(ApiError::AuthExchange { status, payload }) => {
            assert_eq!(status, 200);
            assert_eq!(payload["error"], "invalid_code");
        }
        other => panic!("Expected AuthExchange, got {:?}", other),
    }
}

#[tokio::test]
async fn test_exchange_code_without_access_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&mock_server)
        .await;

    let result = authenticator(&mock_server).exchange_code("code").await;
    assert!(matches!(result, Err(ApiError::InvalidCredential { .. })));
}

#[tokio::test]
async fn test_exchange_then_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-1",
            "refresh_token": "refresh-1",
            "id_token": "id-1",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = authenticator(&mock_server);
    let credential = auth.exchange_code("auth-code").await.unwrap();
    let refreshed = auth.refresh(&credential).await.unwrap();

    assert_eq!(refreshed.access_token.expose(), "access-2");
    assert_eq!(refreshed.refresh_token, Some(Secret::new("refresh-1")));
    assert_eq!(refreshed.id_token, Some(Secret::new("id-1")));
    assert_eq!(refreshed.token_type, "Bearer");
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2"
        })))
        .mount(&mock_server)
        .await;

    let credential = Credential::new("access-1").with_refresh_token("refresh-1");
    let refreshed = authenticator(&mock_server).refresh(&credential).await.unwrap();

    assert_eq!(refreshed.refresh_token, Some(Secret::new("refresh-2")));
}

#[tokio::test]
async fn test_refresh_rejected_requires_reauthorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token expired"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credential = Credential::new("access-1").with_refresh_token("refresh-1");
    let err = authenticator(&mock_server)
        .refresh(&credential)
        .await
        .unwrap_err();

    assert!(err.requires_reauthorization());
    match err {
        ApiError::TokenExpired { payload } => assert_eq!(payload["error"], "invalid_grant"),
        other => panic!("Expected TokenExpired, got {:?}", other),
    }
}

#[tokio::test]
async fn test_refresh_server_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credential = Credential::new("access-1").with_refresh_token("refresh-1");
    let result = authenticator(&mock_server).refresh(&credential).await;

    match result {
        Err(ApiError::RequestFailed {
            status,
            body,
            attempts,
        }) => {
            assert_eq!(status, Some(503));
            assert_eq!(body, "unavailable");
            assert_eq!(attempts, 1);
        }
        other => panic!("Expected RequestFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_basic_client_auth() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(header(
            "authorization",
            "Basic Y2xpZW50X2lkOmNsaWVudF9zZWNyZXQ=",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoints = create_test_endpoints(&mock_server).with_client_auth(ClientAuth::BasicHeader);
    let auth = OAuth2Authenticator::new(create_test_config(), endpoints).unwrap();

    let credential = auth.exchange_code("auth-code").await.unwrap();
    assert_eq!(credential.access_token.expose(), "access-1");
}

#[tokio::test]
async fn test_tenant_is_substituted_in_token_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contoso/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "access-1"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoints = create_test_endpoints(&mock_server)
        .with_token_url(format!("{}/{{tenant}}/token", mock_server.uri()));
    let auth =
        OAuth2Authenticator::new(create_test_config().with_tenant("contoso"), endpoints).unwrap();

    assert!(auth.exchange_code("auth-code").await.is_ok());
}
