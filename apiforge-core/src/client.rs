//! Generic vendor API client.
//!
//! [`ApiClient`] combines an [`EndpointTable`], an [`AuthConfig`], a
//! [`RequestExecutor`] bound to the vendor's API base URL and, once
//! authorized, the credential to send. Vendor facades wrap one `ApiClient`
//! and only map operations to path templates.

use serde_json::Value;

use crate::config::AuthConfig;
use crate::credential::{ApiKeyCredential, Credential};
use crate::endpoint::EndpointTable;
use crate::error::ApiError;
use crate::http::{DEFAULT_TIMEOUT, RequestExecutor, RetryPolicy};
use crate::model::{Authorization, RequestSpec};
use crate::oauth::OAuth2Authenticator;

/// Shared client used by every vendor facade.
#[derive(Debug, Clone)]
pub struct ApiClient {
    authenticator: OAuth2Authenticator,
    executor: RequestExecutor,
    authorization: Authorization,
}

impl ApiClient {
    /// Create an unauthenticated client with the default retry policy.
    pub fn new(config: AuthConfig, endpoints: EndpointTable) -> Result<Self, ApiError> {
        Self::with_policy(config, endpoints, RetryPolicy::default())
    }

    /// Create an unauthenticated client with a custom retry policy.
    pub fn with_policy(
        config: AuthConfig,
        endpoints: EndpointTable,
        policy: RetryPolicy,
    ) -> Result<Self, ApiError> {
        Self::with_policy_and_timeout(config, endpoints, policy, DEFAULT_TIMEOUT)
    }

    /// Create an unauthenticated client with a custom retry policy and
    /// per-attempt timeout.
    pub fn with_policy_and_timeout(
        config: AuthConfig,
        endpoints: EndpointTable,
        policy: RetryPolicy,
        timeout: std::time::Duration,
    ) -> Result<Self, ApiError> {
        let executor = RequestExecutor::with_timeout(endpoints.api_base_url.clone(), policy, timeout)?;
        let authenticator = OAuth2Authenticator::new(config, endpoints)?;
        Ok(Self {
            authenticator,
            executor,
            authorization: Authorization::None,
        })
    }

    /// Attach an OAuth credential. Rejects credentials without an access
    /// token.
    pub fn with_credential(mut self, credential: &Credential) -> Result<Self, ApiError> {
        credential.validate()?;
        self.authorization = credential.authorization();
        Ok(self)
    }

    /// Attach an API key.
    pub fn with_api_key(mut self, key: &ApiKeyCredential) -> Result<Self, ApiError> {
        if key.api_key.is_blank() {
            return Err(ApiError::InvalidCredential {
                message: "api_key is empty".to_string(),
            });
        }
        self.authorization = key.authorization();
        Ok(self)
    }

    /// Attach prepared authorization.
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    pub fn authenticator(&self) -> &OAuth2Authenticator {
        &self.authenticator
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub fn endpoints(&self) -> &EndpointTable {
        self.authenticator.endpoints()
    }

    pub fn is_authorized(&self) -> bool {
        self.authorization != Authorization::None
    }

    /// See [`OAuth2Authenticator::authorization_uri`].
    pub fn authorization_uri(&self) -> Result<String, ApiError> {
        self.authenticator.authorization_uri()
    }

    /// See [`OAuth2Authenticator::exchange_code`].
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ApiError> {
        self.authenticator.exchange_code(code).await
    }

    /// See [`OAuth2Authenticator::refresh`].
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, ApiError> {
        self.authenticator.refresh(credential).await
    }

    /// Execute a request with this client's credentials attached.
    pub async fn fetch(&self, spec: RequestSpec) -> Result<Value, ApiError> {
        let spec = spec.with_authorization(self.authorization.clone());
        self.executor.execute(&spec).await
    }

    /// GET a path template.
    pub async fn get(&self, path: impl Into<String>) -> Result<Value, ApiError> {
        self.fetch(RequestSpec::get(path)).await
    }

    /// GET an opaque absolute pagination URL.
    pub async fn get_page(&self, next_page_url: impl Into<String>) -> Result<Value, ApiError> {
        self.fetch(RequestSpec::get("").with_next_page_url(Some(next_page_url.into())))
            .await
    }

    /// POST a JSON body to a path template.
    pub async fn post_json(&self, path: impl Into<String>, body: Value) -> Result<Value, ApiError> {
        self.fetch(RequestSpec::post(path).with_json(body)).await
    }
}
