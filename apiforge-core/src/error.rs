//! Error types for apiforge.

use thiserror::Error;

use crate::store::StoreError;

/// Error type for outbound vendor calls and the OAuth2 lifecycle.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The authorization code exchange was rejected by the vendor.
    #[error("authorization code exchange rejected with status {status}: {payload}")]
    AuthExchange {
        status: u16,
        payload: serde_json::Value,
    },

    /// The refresh token was rejected or is missing; the caller must run
    /// the authorization flow again.
    #[error("token expired, re-authorization required: {payload}")]
    TokenExpired { payload: serde_json::Value },

    /// A resource call failed after the retry schedule was exhausted, or
    /// failed with a non-retryable status.
    #[error("request failed after {attempts} attempt(s) (status {status:?}): {body}")]
    RequestFailed {
        status: Option<u16>,
        body: String,
        attempts: usize,
    },

    /// The vendor answered 2xx but flagged the call as failed in the payload.
    #[error("vendor rejected the request: {payload}")]
    VendorRejected { payload: serde_json::Value },

    /// A 2xx body was not valid JSON.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A URL could not be built or parsed.
    #[error("invalid URL: {message}")]
    InvalidUrl { message: String },

    /// The credential is missing required material.
    #[error("invalid credential: {message}")]
    InvalidCredential { message: String },

    /// The HTTP client could not be constructed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Whether the caller must restart the authorization flow.
    pub fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::TokenExpired { .. })
    }
}

/// Top-level error type encompassing all apiforge errors.
#[derive(Debug, Error)]
pub enum ApiforgeError {
    /// Error from a vendor call.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Error from credential storage.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}
