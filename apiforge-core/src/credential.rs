//! Token material and per-vendor credential records.
//!
//! This module provides:
//! - [`Credential`] - OAuth2 token material obtained from a token endpoint
//! - [`TokenResponse`] - The token endpoint's wire format
//! - [`ApiKeyCredential`] - Static API key material
//! - [`CredentialRecord`] - What gets persisted, tagged by vendor

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{Authorization, VendorId};
use crate::secret::Secret;

/// Token type used when the vendor does not send one.
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Header carrying API keys for key-based vendors.
pub const API_KEY_HEADER: &str = "X-Api-Key";

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

/// OAuth2 token material.
///
/// A credential is only usable with a non-empty `access_token`; see
/// [`Credential::validate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credential {
    pub access_token: Secret,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<Secret>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<Secret>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds, as reported by the vendor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// When the token was issued to us.
    #[serde(default = "chrono::Utc::now")]
    pub obtained_at: DateTime<Utc>,
}

impl Credential {
    /// Create a bearer credential from an access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token),
            refresh_token: None,
            id_token: None,
            token_type: default_token_type(),
            expires_in: None,
            scope: None,
            obtained_at: Utc::now(),
        }
    }

    pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.refresh_token = Some(Secret::new(token));
        self
    }

    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(Secret::new(token));
        self
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    pub fn with_expires_in(mut self, seconds: u64) -> Self {
        self.expires_in = Some(seconds);
        self
    }

    /// Reject credentials without an access token.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.access_token.is_blank() {
            return Err(ApiError::InvalidCredential {
                message: "access_token is empty".to_string(),
            });
        }
        Ok(())
    }

    /// Absolute expiry, if the vendor reported a lifetime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let seconds = i64::try_from(self.expires_in?).ok()?;
        Some(self.obtained_at + Duration::seconds(seconds))
    }

    /// Returns `false` if no lifetime is known.
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::zero())
    }

    /// Whether the token expires within the given window.
    pub fn expires_within(&self, window: Duration) -> bool {
        self.expires_at()
            .map(|exp| exp < Utc::now() + window)
            .unwrap_or(false)
    }

    /// `Authorization: {token_type} {access_token}`.
    pub fn authorization(&self) -> Authorization {
        Authorization::Token {
            token_type: self.token_type.clone(),
            token: self.access_token.clone(),
        }
    }

    /// Apply a refresh response.
    ///
    /// The access token is replaced. The refresh and ID tokens are kept
    /// unless the vendor rotated them, and the token type falls back to
    /// `Bearer` when the response omits it.
    pub fn refreshed(&self, response: TokenResponse) -> Result<Credential, ApiError> {
        let mut next = response.into_credential()?;
        if next.refresh_token.is_none() {
            next.refresh_token = self.refresh_token.clone();
        }
        if next.id_token.is_none() {
            next.id_token = self.id_token.clone();
        }
        if next.scope.is_none() {
            next.scope = self.scope.clone();
        }
        Ok(next)
    }

    /// Copy with string fields trimmed.
    pub fn trimmed(&self) -> Self {
        Self {
            access_token: self.access_token.trimmed(),
            refresh_token: self.refresh_token.as_ref().map(Secret::trimmed),
            id_token: self.id_token.as_ref().map(Secret::trimmed),
            token_type: self.token_type.trim().to_string(),
            expires_in: self.expires_in,
            scope: self.scope.as_ref().map(|s| s.trim().to_string()),
            obtained_at: self.obtained_at,
        }
    }
}

/// Successful token endpoint response.
///
/// Fields are optional on the wire; [`TokenResponse::into_credential`]
/// enforces the invariants.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub token_type: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub id_token: Option<String>,

    /// Some vendors send a number, others a numeric string.
    #[serde(default)]
    pub expires_in: Option<serde_json::Value>,

    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    fn expires_in_secs(&self) -> Option<u64> {
        match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert into a credential, defaulting the token type to `Bearer`.
    pub fn into_credential(self) -> Result<Credential, ApiError> {
        let expires_in = self.expires_in_secs();

        let access_token = self
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidCredential {
                message: "token response did not contain an access_token".to_string(),
            })?;

        let token_type = self
            .token_type
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(default_token_type);

        Ok(Credential {
            access_token: Secret::new(access_token),
            refresh_token: self.refresh_token.map(Secret::new),
            id_token: self.id_token.map(Secret::new),
            token_type,
            expires_in,
            scope: self.scope,
            obtained_at: Utc::now(),
        })
    }
}

/// Static API key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyCredential {
    pub api_key: Secret,
}

impl ApiKeyCredential {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            api_key: Secret::new(key),
        }
    }

    pub fn authorization(&self) -> Authorization {
        Authorization::ApiKey {
            header: API_KEY_HEADER.to_string(),
            key: self.api_key.clone(),
        }
    }
}

/// A persisted credential, tagged by vendor.
///
/// Each variant declares which of its fields the document store must
/// encrypt and which must be unique across records of that variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "vendor", rename_all = "snake_case")]
pub enum CredentialRecord {
    Sharepoint(Credential),
    Slack(Credential),
    Attentive(Credential),
    Terminus(ApiKeyCredential),
}

impl CredentialRecord {
    /// Wrap OAuth token material for an OAuth vendor.
    ///
    /// Returns `None` for vendors that do not use OAuth.
    pub fn for_oauth_vendor(vendor: &VendorId, credential: Credential) -> Option<Self> {
        match vendor.as_str() {
            "sharepoint" => Some(Self::Sharepoint(credential)),
            "slack" => Some(Self::Slack(credential)),
            "attentive" => Some(Self::Attentive(credential)),
            _ => None,
        }
    }

    pub fn vendor(&self) -> VendorId {
        VendorId::new(match self {
            Self::Sharepoint(_) => "sharepoint",
            Self::Slack(_) => "slack",
            Self::Attentive(_) => "attentive",
            Self::Terminus(_) => "terminus",
        })
    }

    /// Name of the stored variant.
    pub fn discriminator(&self) -> &'static str {
        match self {
            Self::Sharepoint(_) => "SharepointCredentials",
            Self::Slack(_) => "SlackCredential",
            Self::Attentive(_) => "AttentiveCredentials",
            Self::Terminus(_) => "TerminusCredentials",
        }
    }

    /// Fields the store must encrypt at rest.
    ///
    /// OAuth variants share one [`Credential`] shape, so every token field
    /// is tagged whether or not the vendor usually issues it.
    pub fn encrypted_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Sharepoint(_) | Self::Slack(_) | Self::Attentive(_) => {
                &["access_token", "refresh_token", "id_token"]
            }
            Self::Terminus(_) => &["api_key"],
        }
    }

    /// Fields that must be unique among records with the same discriminator.
    pub fn unique_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Terminus(_) => &["api_key"],
            _ => &[],
        }
    }

    /// OAuth token material, if this vendor uses OAuth.
    pub fn oauth(&self) -> Option<&Credential> {
        match self {
            Self::Sharepoint(c) | Self::Slack(c) | Self::Attentive(c) => Some(c),
            Self::Terminus(_) => None,
        }
    }

    /// Replace the OAuth token material. Returns `false` for key-based
    /// vendors, which are left untouched.
    pub fn replace_oauth(&mut self, credential: Credential) -> bool {
        match self {
            Self::Sharepoint(c) | Self::Slack(c) | Self::Attentive(c) => {
                *c = credential;
                true
            }
            Self::Terminus(_) => false,
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        match self {
            Self::Sharepoint(c) | Self::Slack(c) | Self::Attentive(c) => c.validate(),
            Self::Terminus(k) if k.api_key.is_blank() => Err(ApiError::InvalidCredential {
                message: "api_key is empty".to_string(),
            }),
            Self::Terminus(_) => Ok(()),
        }
    }

    /// Copy with string fields trimmed.
    pub fn trimmed(&self) -> Self {
        match self {
            Self::Sharepoint(c) => Self::Sharepoint(c.trimmed()),
            Self::Slack(c) => Self::Slack(c.trimmed()),
            Self::Attentive(c) => Self::Attentive(c.trimmed()),
            Self::Terminus(k) => Self::Terminus(ApiKeyCredential {
                api_key: k.api_key.trimmed(),
            }),
        }
    }

    /// How requests made with this record authenticate.
    ///
    /// Slack issues bot tokens with `token_type: "bot"` but only accepts
    /// them as bearer tokens.
    pub fn authorization(&self) -> Authorization {
        match self {
            Self::Slack(c) => Authorization::Token {
                token_type: DEFAULT_TOKEN_TYPE.to_string(),
                token: c.access_token.clone(),
            },
            Self::Sharepoint(c) | Self::Attentive(c) => c.authorization(),
            Self::Terminus(k) => k.authorization(),
        }
    }
}
