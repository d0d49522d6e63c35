//! Vendor endpoint tables and registry.
//!
//! This module provides:
//! - [`EndpointTable`] - The OAuth2 and resource endpoints of one vendor
//! - [`EndpointRegistry`] - Lookup of endpoint tables by vendor ID
//!
//! URL templates may contain `{tenant}`, which is substituted with the
//! tenant of the [`AuthConfig`](crate::AuthConfig) in use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::VendorId;

/// Placeholder substituted with the configured tenant.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// How the client authenticates itself at the token endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuth {
    /// `client_id` and `client_secret` in the form body.
    #[default]
    RequestBody,

    /// HTTP Basic authentication header.
    BasicHeader,
}

/// Query parameter appended to authorization URLs when consent is forced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConsentPrompt {
    pub param: String,
    pub value: String,
}

impl ConsentPrompt {
    /// `prompt=select_account`, the parameter used by Microsoft identity.
    pub fn select_account() -> Self {
        Self {
            param: "prompt".to_string(),
            value: "select_account".to_string(),
        }
    }
}

/// Endpoints and quirks of one vendor.
///
/// # Example
///
/// ```
/// use apiforge_core::EndpointTable;
///
/// let table = EndpointTable::new("example", "Example")
///     .with_authorize_url("https://login.example.com/{tenant}/authorize")
///     .with_token_url("https://login.example.com/{tenant}/token")
///     .with_api_base_url("https://api.example.com/v1");
///
/// assert_eq!(
///     table.authorize_url_for("common"),
///     "https://login.example.com/common/authorize"
/// );
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointTable {
    /// Vendor identifier (e.g., "sharepoint").
    pub id: VendorId,

    /// Human-readable name.
    pub name: String,

    /// Authorization endpoint template.
    pub authorize_url: String,

    /// Token endpoint template.
    pub token_url: String,

    /// Base URL resource paths are appended to.
    pub api_base_url: String,

    /// Scopes requested when the configuration names none.
    pub default_scopes: Vec<String>,

    /// Parameter sent when consent is forced; `None` if the vendor has none.
    pub consent_prompt: Option<ConsentPrompt>,

    /// Client authentication method at the token endpoint.
    pub client_auth: ClientAuth,
}

impl EndpointTable {
    /// Create an empty endpoint table.
    pub fn new(id: impl Into<VendorId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            authorize_url: String::new(),
            token_url: String::new(),
            api_base_url: String::new(),
            default_scopes: Vec::new(),
            consent_prompt: None,
            client_auth: ClientAuth::default(),
        }
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    pub fn with_consent_prompt(mut self, prompt: ConsentPrompt) -> Self {
        self.consent_prompt = Some(prompt);
        self
    }

    pub fn with_client_auth(mut self, auth: ClientAuth) -> Self {
        self.client_auth = auth;
        self
    }

    /// Authorization endpoint with the tenant substituted.
    pub fn authorize_url_for(&self, tenant: &str) -> String {
        self.authorize_url.replace(TENANT_PLACEHOLDER, tenant)
    }

    /// Token endpoint with the tenant substituted.
    pub fn token_url_for(&self, tenant: &str) -> String {
        self.token_url.replace(TENANT_PLACEHOLDER, tenant)
    }

    /// Whether this vendor supports the authorization code flow.
    pub fn supports_oauth(&self) -> bool {
        !self.authorize_url.is_empty() && !self.token_url.is_empty()
    }
}

/// Registry of vendor endpoint tables.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    tables: HashMap<VendorId, EndpointTable>,
}

impl EndpointRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint table, replacing any table with the same ID.
    pub fn register(&mut self, table: EndpointTable) {
        self.tables.insert(table.id.clone(), table);
    }

    /// Look up a table by vendor ID.
    pub fn get(&self, id: &str) -> Option<&EndpointTable> {
        self.tables.get(&VendorId::new(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Registered vendor IDs, sorted.
    pub fn list_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.tables.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
