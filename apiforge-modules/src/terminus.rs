//! Terminus ABM platform.
//!
//! Terminus has no OAuth flow; requests carry a static key in the
//! `X-Api-Key` header.

use apiforge_core::{
    ApiClient, ApiError, ApiKeyCredential, AuthConfig, EndpointTable, RequestSpec, RetryPolicy,
};
use serde_json::Value;

/// Vendor ID.
pub const VENDOR_ID: &str = "terminus";

/// API base URL.
pub const BASE_URL: &str = "https://api.terminusplatform.com/v1";

/// API base URL only; there are no OAuth endpoints.
pub fn endpoints() -> EndpointTable {
    EndpointTable::new(VENDOR_ID, "Terminus").with_api_base_url(BASE_URL)
}

pub mod urls {
    pub const ACCOUNT_LISTS: &str = "/account-lists";

    pub fn account_list(list_id: &str) -> String {
        format!("/account-lists/{}", list_id)
    }

    pub fn account_list_accounts(list_id: &str) -> String {
        format!("/account-lists/{}/accounts", list_id)
    }
}

/// Terminus facade.
#[derive(Debug, Clone)]
pub struct TerminusApi {
    client: ApiClient,
}

impl TerminusApi {
    /// Create a facade authenticated with an API key.
    pub fn new(key: &ApiKeyCredential) -> Result<Self, ApiError> {
        Self::with_policy(key, RetryPolicy::default())
    }

    pub fn with_policy(key: &ApiKeyCredential, policy: RetryPolicy) -> Result<Self, ApiError> {
        let client = ApiClient::with_policy(AuthConfig::default(), endpoints(), policy)?;
        Ok(Self::from_client(client.with_api_key(key)?))
    }

    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub async fn list_account_lists(&self) -> Result<Value, ApiError> {
        self.client.get(urls::ACCOUNT_LISTS).await
    }

    pub async fn get_account_list(&self, list_id: &str) -> Result<Value, ApiError> {
        self.client.get(urls::account_list(list_id)).await
    }

    /// Add accounts to a list. `body` is passed through as JSON, e.g.
    /// `{"accounts": [{"domain": "example.com"}]}`.
    pub async fn add_accounts_to_list(&self, list_id: &str, body: Value) -> Result<Value, ApiError> {
        let spec = RequestSpec::post(urls::account_list_accounts(list_id)).with_json(body);
        self.client.fetch(spec).await
    }
}
