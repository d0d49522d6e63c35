//! Slack Web API.
//!
//! Slack reports most failures as `200 {"ok": false, "error": ...}`; the
//! facade turns those into [`ApiError::VendorRejected`]. Bot tokens are
//! issued with `token_type: "bot"` but are always sent as bearer tokens.

use apiforge_core::{
    ApiClient, ApiError, AuthConfig, Credential, CredentialRecord, EndpointTable, RequestSpec,
};
use serde_json::{Value, json};
use tracing::warn;

/// Vendor ID.
pub const VENDOR_ID: &str = "slack";

/// Web API base URL.
pub const BASE_URL: &str = "https://slack.com/api";

/// Page size for cursor-paginated listings.
pub const PAGE_LIMIT: u32 = 200;

/// Slack OAuth v2 endpoints and Web API base URL.
pub fn endpoints() -> EndpointTable {
    EndpointTable::new(VENDOR_ID, "Slack")
        .with_authorize_url("https://slack.com/oauth/v2/authorize")
        .with_token_url("https://slack.com/api/oauth.v2.access")
        .with_api_base_url(BASE_URL)
        .with_scopes(vec![
            "channels:read".to_string(),
            "chat:write".to_string(),
            "users:read".to_string(),
        ])
}

pub mod urls {
    pub const AUTH_TEST: &str = "/auth.test";
    pub const CONVERSATIONS_LIST: &str = "/conversations.list";
    pub const USERS_INFO: &str = "/users.info";
    pub const CHAT_POST_MESSAGE: &str = "/chat.postMessage";
}

/// Fail on `"ok": false` payloads.
fn check_ok(payload: Value) -> Result<Value, ApiError> {
    if payload.get("ok") == Some(&Value::Bool(false)) {
        let error = payload
            .get("error")
            .and_then(|e| e.as_str())
            .unwrap_or("unknown");
        warn!("Slack rejected request: {}", error);
        return Err(ApiError::VendorRejected { payload });
    }
    Ok(payload)
}

/// Slack Web API facade.
#[derive(Debug, Clone)]
pub struct SlackApi {
    client: ApiClient,
}

impl SlackApi {
    pub fn new(config: AuthConfig) -> Result<Self, ApiError> {
        Ok(Self::from_client(ApiClient::new(config, endpoints())?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// Attach an OAuth credential, sent as a bearer token regardless of
    /// the stored token type.
    pub fn with_credential(self, credential: &Credential) -> Result<Self, ApiError> {
        credential.validate()?;
        let record = CredentialRecord::Slack(credential.clone());
        Ok(Self {
            client: self.client.with_authorization(record.authorization()),
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn authorization_uri(&self) -> Result<String, ApiError> {
        self.client.authorization_uri()
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ApiError> {
        self.client.exchange_code(code).await
    }

    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, ApiError> {
        self.client.refresh(credential).await
    }

    /// Identity of the token's user and workspace.
    pub async fn auth_test(&self) -> Result<Value, ApiError> {
        check_ok(self.client.fetch(RequestSpec::post(urls::AUTH_TEST)).await?)
    }

    /// One page of conversations. Pass the previous page's
    /// `response_metadata.next_cursor` to continue.
    pub async fn list_conversations(&self, cursor: Option<&str>) -> Result<Value, ApiError> {
        let mut spec =
            RequestSpec::get(urls::CONVERSATIONS_LIST).with_query("limit", PAGE_LIMIT.to_string());
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            spec = spec.with_query("cursor", cursor);
        }
        check_ok(self.client.fetch(spec).await?)
    }

    pub async fn get_user_info(&self, user_id: &str) -> Result<Value, ApiError> {
        let spec = RequestSpec::get(urls::USERS_INFO).with_query("user", user_id);
        check_ok(self.client.fetch(spec).await?)
    }

    pub async fn post_message(&self, channel: &str, text: &str) -> Result<Value, ApiError> {
        let body = json!({ "channel": channel, "text": text });
        check_ok(self.client.post_json(urls::CHAT_POST_MESSAGE, body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_ok() {
        assert!(check_ok(json!({"ok": true})).is_ok());
        assert!(check_ok(json!({"channels": []})).is_ok());
        assert!(matches!(
            check_ok(json!({"ok": false, "error": "channel_not_found"})),
            Err(ApiError::VendorRejected { .. })
        ));
    }

    #[test]
    fn test_authorization_uri_has_no_prompt() {
        let config = AuthConfig::new("client_id")
            .with_redirect_uri("https://app.example.com/slack")
            .with_scope("chat:write");
        let api = SlackApi::new(config).unwrap();
        assert_eq!(
            api.authorization_uri().unwrap(),
            "https://slack.com/oauth/v2/authorize?client_id=client_id&response_type=code\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Fslack&scope=chat%3Awrite"
        );
    }

    #[test]
    fn test_bot_token_sent_as_bearer() {
        let credential = Credential::new("xoxb-1").with_token_type("bot");
        let api = SlackApi::new(AuthConfig::default())
            .unwrap()
            .with_credential(&credential)
            .unwrap();
        assert!(api.client().is_authorized());
    }
}
