//! OAuth 2.0 authorization code flow.
//!
//! [`OAuth2Authenticator`] is parameterized by an [`AuthConfig`] and an
//! [`EndpointTable`] and covers the three steps every vendor module shares:
//!
//! 1. Build the authorization URL the user visits
//! 2. Exchange the authorization code for a [`Credential`]
//! 3. Refresh the credential when it expires
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), apiforge_core::ApiError> {
//! use apiforge_core::{AuthConfig, EndpointTable, OAuth2Authenticator};
//!
//! let endpoints = EndpointTable::new("example", "Example")
//!     .with_authorize_url("https://login.example.com/{tenant}/authorize")
//!     .with_token_url("https://login.example.com/{tenant}/token");
//! let config = AuthConfig::new("client-id")
//!     .with_client_secret("client-secret")
//!     .with_redirect_uri("https://app.example.com/callback");
//!
//! let auth = OAuth2Authenticator::new(config, endpoints)?;
//! println!("Visit: {}", auth.authorization_uri()?);
//!
//! // After the user authorizes and the redirect delivers the code...
//! let credential = auth.exchange_code("authorization-code").await?;
//! let credential = auth.refresh(&credential).await?;
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::AuthConfig;
use crate::credential::{Credential, TokenResponse};
use crate::endpoint::{ClientAuth, EndpointTable};
use crate::error::ApiError;
use crate::http::{RawResponse, RequestExecutor, RetryPolicy};
use crate::model::{Authorization, RequestSpec};

/// Length of generated `state` values.
const STATE_LENGTH: usize = 32;

/// Generate a random alphanumeric `state` value for CSRF protection.
pub fn random_state() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();

    (0..STATE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Whether a 2xx token response reports a failure in its body.
///
/// Slack answers `200 {"ok": false, "error": ...}`; others send an `error`
/// field without any token.
fn rejected_in_body(payload: &Value) -> bool {
    if payload.get("ok") == Some(&Value::Bool(false)) {
        return true;
    }
    payload.get("error").is_some() && payload.get("access_token").is_none()
}

/// OAuth2 authorization code flow for one vendor and one client config.
///
/// Stateless apart from the immutable configuration.
#[derive(Debug, Clone)]
pub struct OAuth2Authenticator {
    config: AuthConfig,
    endpoints: EndpointTable,
    token_executor: RequestExecutor,
}

impl OAuth2Authenticator {
    /// Create an authenticator. Token requests are never retried.
    pub fn new(config: AuthConfig, endpoints: EndpointTable) -> Result<Self, ApiError> {
        let token_url = endpoints.token_url_for(&config.tenant_id);
        let token_executor = RequestExecutor::new(token_url, RetryPolicy::no_retry())?;
        Ok(Self {
            config,
            endpoints,
            token_executor,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    /// Authorization endpoint with the configured tenant.
    pub fn authorization_endpoint(&self) -> String {
        self.endpoints.authorize_url_for(&self.config.tenant_id)
    }

    /// Token endpoint with the configured tenant.
    pub fn token_endpoint(&self) -> String {
        self.endpoints.token_url_for(&self.config.tenant_id)
    }

    /// Configured scope, or the vendor's default scopes.
    fn scope(&self) -> String {
        if self.config.scope.is_empty() {
            self.endpoints.default_scopes.join(" ")
        } else {
            self.config.scope.clone()
        }
    }

    /// Build the URL the user visits to grant access.
    ///
    /// Parameters are emitted in a fixed order: `client_id`,
    /// `response_type=code`, `redirect_uri`, `scope`, `state` (when set) and
    /// the vendor's consent prompt (when consent is forced).
    pub fn authorization_uri(&self) -> Result<String, ApiError> {
        let base = self.authorization_endpoint();
        let mut url = url::Url::parse(&base).map_err(|e| ApiError::InvalidUrl {
            message: format!("invalid authorization URL {}: {}", base, e),
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.config.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("scope", &self.scope());
            if let Some(state) = &self.config.state {
                pairs.append_pair("state", state);
            }
            if self.config.force_consent {
                if let Some(prompt) = &self.endpoints.consent_prompt {
                    pairs.append_pair(&prompt.param, &prompt.value);
                }
            }
        }

        Ok(url.to_string())
    }

    /// Build a token endpoint request carrying the client credentials.
    fn token_request(&self, mut form: Vec<(String, String)>) -> RequestSpec {
        let mut spec = RequestSpec::post("");

        match self.endpoints.client_auth {
            ClientAuth::RequestBody => {
                form.push(("client_id".to_string(), self.config.client_id.clone()));
                if let Some(secret) = &self.config.client_secret {
                    form.push(("client_secret".to_string(), secret.expose().to_string()));
                }
            }
            ClientAuth::BasicHeader => {
                spec = spec.with_authorization(Authorization::Basic {
                    username: self.config.client_id.clone(),
                    password: self.config.client_secret.clone().unwrap_or_else(|| "".into()),
                });
            }
        }

        spec.with_form(form)
    }

    async fn send_token_request(&self, spec: &RequestSpec) -> Result<RawResponse, ApiError> {
        debug!("POST {} ({})", self.token_endpoint(), self.endpoints.id);
        self.token_executor.dispatch(spec).await
    }

    /// Exchange an authorization code for a credential.
    ///
    /// # Errors
    ///
    /// - [`ApiError::AuthExchange`] with the vendor's payload if the token
    ///   endpoint rejects the code
    /// - [`ApiError::InvalidCredential`] if the response has no access token
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ApiError> {
        let mut form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
        ];
        let scope = self.scope();
        if !scope.is_empty() {
            form.push(("scope".to_string(), scope));
        }

        let response = self.send_token_request(&self.token_request(form)).await?;
        let status = response.status.as_u16();

        if !response.status.is_success() {
            warn!("{} rejected authorization code (status {})", self.endpoints.id, status);
            return Err(ApiError::AuthExchange {
                status,
                payload: response.payload(),
            });
        }

        let payload = response.json()?;
        if rejected_in_body(&payload) {
            warn!("{} rejected authorization code in response body", self.endpoints.id);
            return Err(ApiError::AuthExchange { status, payload });
        }

        let token: TokenResponse = serde_json::from_value(payload)?;
        let credential = token.into_credential()?;

        info!("Exchanged authorization code for {} credential", self.endpoints.id);
        Ok(credential)
    }

    /// Obtain a new access token using the credential's refresh token.
    ///
    /// # Errors
    ///
    /// - [`ApiError::TokenExpired`] if the credential has no refresh token or
    ///   the vendor rejects it; the authorization flow must be run again
    /// - [`ApiError::RequestFailed`] if the token endpoint fails for another
    ///   reason
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, ApiError> {
        let refresh_token = credential
            .refresh_token
            .as_ref()
            .filter(|t| !t.is_blank())
            .ok_or_else(|| ApiError::TokenExpired {
                payload: json!({
                    "error": "missing_refresh_token",
                    "error_description": "credential has no refresh token",
                }),
            })?;

        let mut form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.expose().to_string()),
        ];
        let scope = self.scope();
        if !scope.is_empty() {
            form.push(("scope".to_string(), scope));
        }

        let response = self.send_token_request(&self.token_request(form)).await?;
        let status = response.status;

        if status.is_client_error() {
            warn!("{} rejected refresh token (status {})", self.endpoints.id, status);
            return Err(ApiError::TokenExpired {
                payload: response.payload(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::RequestFailed {
                status: Some(status.as_u16()),
                body: response.body,
                attempts: 1,
            });
        }

        let payload = response.json()?;
        if rejected_in_body(&payload) {
            warn!("{} rejected refresh token in response body", self.endpoints.id);
            return Err(ApiError::TokenExpired { payload });
        }

        let token: TokenResponse = serde_json::from_value(payload)?;
        let refreshed = credential.refreshed(token)?;

        info!("Refreshed {} credential", self.endpoints.id);
        Ok(refreshed)
    }
}
