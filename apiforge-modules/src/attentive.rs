//! Attentive SMS and email marketing API.

use apiforge_core::{ApiClient, ApiError, AuthConfig, Credential, EndpointTable};
use serde::Serialize;
use serde_json::{Map, Value};

/// Vendor ID.
pub const VENDOR_ID: &str = "attentive";

/// API base URL.
pub const BASE_URL: &str = "https://api.attentivemobile.com/v1";

/// Attentive app-install endpoints and API base URL.
pub fn endpoints() -> EndpointTable {
    EndpointTable::new(VENDOR_ID, "Attentive")
        .with_authorize_url("https://ui.attentivemobile.com/integrations/oauth-install")
        .with_token_url("https://api.attentivemobile.com/v1/authorization-codes/tokens")
        .with_api_base_url(BASE_URL)
        .with_scopes(vec![
            "subscriptions:write".to_string(),
            "events:write".to_string(),
            "attributes:write".to_string(),
        ])
}

pub mod urls {
    pub const ME: &str = "/me";
    pub const SUBSCRIPTIONS: &str = "/subscriptions";
    pub const CUSTOM_EVENTS: &str = "/events/custom";
    pub const CUSTOM_ATTRIBUTES: &str = "/attributes/custom";
}

/// Identifies a subscriber. Attentive requires at least one field.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_identifiers: Option<Value>,
}

impl User {
    pub fn with_phone(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
            ..Self::default()
        }
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }
}

/// Body of a subscription request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub user: User,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_up_source_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Body of a custom event.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomEvent {
    /// Event name, e.g. "Order Shipped".
    #[serde(rename = "type")]
    pub event_type: String,

    pub user: User,

    #[serde(skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

/// Attentive facade.
#[derive(Debug, Clone)]
pub struct AttentiveApi {
    client: ApiClient,
}

impl AttentiveApi {
    pub fn new(config: AuthConfig) -> Result<Self, ApiError> {
        Ok(Self::from_client(ApiClient::new(config, endpoints())?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn with_credential(self, credential: &Credential) -> Result<Self, ApiError> {
        Ok(Self {
            client: self.client.with_credential(credential)?,
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

    /// The company and application the token belongs to.
    pub async fn get_me(&self) -> Result<Value, ApiError> {
        self.client.get(urls::ME).await
    }

    pub async fn subscribe_user(&self, subscription: &Subscription) -> Result<Value, ApiError> {
        self.client
            .post_json(urls::SUBSCRIPTIONS, serde_json::to_value(subscription)?)
            .await
    }

    pub async fn send_custom_event(&self, event: &CustomEvent) -> Result<Value, ApiError> {
        self.client
            .post_json(urls::CUSTOM_EVENTS, serde_json::to_value(event)?)
            .await
    }

    /// Set custom attributes on a subscriber.
    pub async fn set_custom_attributes(
        &self,
        user: &User,
        properties: Map<String, Value>,
    ) -> Result<Value, ApiError> {
        let body = serde_json::json!({
            "user": user,
            "properties": properties,
        });
        self.client.post_json(urls::CUSTOM_ATTRIBUTES, body).await
    }
}
