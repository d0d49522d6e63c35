//! Per-client OAuth2 configuration.

use serde::{Deserialize, Serialize};

use crate::secret::Secret;

/// Tenant used when none is configured.
pub const DEFAULT_TENANT: &str = "common";

fn default_tenant() -> String {
    DEFAULT_TENANT.to_string()
}

fn default_force_consent() -> bool {
    true
}

/// OAuth2 settings supplied by the caller when a client is constructed.
///
/// Immutable once handed to a client. Omitted fields take the documented
/// defaults: `tenant_id = "common"`, `state = None`, `force_consent = true`.
///
/// # Example
///
/// ```
/// use apiforge_core::AuthConfig;
///
/// let config = AuthConfig::new("client-id")
///     .with_redirect_uri("https://app.example.com/callback")
///     .with_scope("offline_access Files.Read.All");
///
/// assert_eq!(config.tenant_id, "common");
/// assert!(config.force_consent);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: Option<Secret>,

    #[serde(default)]
    pub redirect_uri: String,

    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub state: Option<String>,

    /// Tenant or realm substituted into `{tenant}` URL templates.
    #[serde(default = "default_tenant")]
    pub tenant_id: String,

    /// Ask the vendor to show the account picker even when a session exists.
    #[serde(default = "default_force_consent")]
    pub force_consent: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: None,
            redirect_uri: String::new(),
            scope: String::new(),
            state: None,
            tenant_id: default_tenant(),
            force_consent: default_force_consent(),
        }
    }
}

impl AuthConfig {
    /// Create a configuration for the given client ID.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(Secret::new(secret));
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant_id = tenant.into();
        self
    }

    pub fn with_force_consent(mut self, force: bool) -> Self {
        self.force_consent = force;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthConfig::default();
        assert_eq!(config.tenant_id, "common");
        assert!(config.state.is_none());
        assert!(config.force_consent);
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let config: AuthConfig = serde_json::from_str(r#"{"client_id": "abc"}"#).unwrap();
        assert_eq!(config.client_id, "abc");
        assert_eq!(config.tenant_id, "common");
        assert!(config.force_consent);
        assert!(config.client_secret.is_none());
    }

    #[test]
    fn test_deserialize_explicit_opt_out() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"tenant_id": "contoso", "force_consent": false}"#).unwrap();
        assert_eq!(config.tenant_id, "contoso");
        assert!(!config.force_consent);
    }

    #[test]
    fn test_builder() {
        let config = AuthConfig::new("id")
            .with_client_secret("shh")
            .with_state("xyz")
            .with_tenant("tenant_id")
            .with_force_consent(false);
        assert_eq!(config.client_secret.unwrap().expose(), "shh");
        assert_eq!(config.state.as_deref(), Some("xyz"));
        assert_eq!(config.tenant_id, "tenant_id");
        assert!(!config.force_consent);
    }
}
