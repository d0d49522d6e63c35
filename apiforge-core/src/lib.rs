//! # apiforge Core
//!
//! Shared framework for apiforge vendor modules.
//!
//! This crate provides:
//! - An HTTP executor with a fixed back-off schedule and cursor pagination
//! - A generic OAuth2 authorization code client, parameterized by an
//!   [`AuthConfig`] and an [`EndpointTable`]
//! - The [`ApiClient`] every vendor facade is built on
//! - Credential records with field-level encryption and uniqueness tags,
//!   and a [`CredentialStore`] that persists them through a [`DocumentStore`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use apiforge_core::{ApiClient, AuthConfig, EndpointTable};
//!
//! async fn me(endpoints: EndpointTable, code: &str) -> Result<serde_json::Value, apiforge_core::ApiError> {
//!     let client = ApiClient::new(AuthConfig::new("client-id"), endpoints)?;
//!     let credential = client.exchange_code(code).await?;
//!     client.with_credential(&credential)?.get("/me").await
//! }
//! ```

pub mod client;
pub mod config;
pub mod credential;
pub mod credential_store;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod model;
pub mod oauth;
pub mod secret;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export commonly used types at crate root
pub use client::ApiClient;

pub use config::{AuthConfig, DEFAULT_TENANT};

pub use credential::{
    ApiKeyCredential,
    Credential,
    CredentialRecord,
    TokenResponse,
};

pub use credential_store::CredentialStore;

pub use endpoint::{
    ClientAuth,
    ConsentPrompt,
    EndpointRegistry,
    EndpointTable,
};

pub use error::{ApiError, ApiforgeError};

pub use http::{RawResponse, RequestExecutor, RetryPolicy};

pub use model::{
    Authorization,
    CredentialId,
    RequestBody,
    RequestSpec,
    VendorId,
};

pub use oauth::{OAuth2Authenticator, random_state};

pub use secret::Secret;

pub use store::{
    Document,
    DocumentStore,
    FileDocumentStore,
    MemoryDocumentStore,
    StoreError,
};
