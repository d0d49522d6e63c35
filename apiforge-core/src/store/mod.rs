//! Document storage abstraction for credential records.
//!
//! This module provides:
//! - [`Document`] - A stored record with its field-level tags
//! - [`DocumentStore`] - Trait for storage backends
//! - [`MemoryDocumentStore`] - In-memory implementation for testing
//! - [`FileDocumentStore`] - JSON file in the platform data directory
//!
//! # Field Tags
//!
//! A [`Document`] names the fields that must be encrypted at rest and the
//! fields that must be unique among documents with the same discriminator.
//! Backends own the encryption; both built-in backends enforce uniqueness.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

use crate::model::CredentialId;

mod file;
mod memory;

pub use file::{DEFAULT_FILE_NAME, FileDocumentStore};
pub use memory::MemoryDocumentStore;

/// A stored record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Name of the record variant (e.g., "SlackCredential").
    pub discriminator: String,

    /// Field values.
    pub fields: serde_json::Map<String, serde_json::Value>,

    /// Fields to encrypt at rest.
    #[serde(default)]
    pub encrypted: BTreeSet<String>,

    /// Fields that must be unique per discriminator.
    #[serde(default)]
    pub unique: BTreeSet<String>,
}

impl Document {
    pub fn new(discriminator: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            fields: serde_json::Map::new(),
            encrypted: BTreeSet::new(),
            unique: BTreeSet::new(),
        }
    }

    /// Whether the backend must encrypt this field.
    pub fn is_encrypted(&self, field: &str) -> bool {
        self.encrypted.contains(field)
    }
}

/// Error type for document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document with this ID.
    #[error("credential not found: {id}")]
    NotFound { id: String },

    /// A document with this ID already exists.
    #[error("credential already exists: {id}")]
    AlreadyExists { id: String },

    /// Another document already holds this value in a unique field.
    #[error("duplicate value for unique field '{field}' in {discriminator}")]
    UniqueViolation { discriminator: String, field: String },

    /// The storage backend encountered an error.
    #[error("backend error: {message}")]
    BackendError { message: String },

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O error reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform data directory could not be determined.
    #[error("data directory not available")]
    DataDirUnavailable,
}

/// Abstraction over document storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document. Fails if the ID is taken or a unique field
    /// collides with another document.
    async fn insert(&self, id: &CredentialId, document: Document) -> Result<(), StoreError>;

    /// Retrieve a document. Returns `Ok(None)` if the ID doesn't exist.
    async fn get(&self, id: &CredentialId) -> Result<Option<Document>, StoreError>;

    /// Replace an existing document.
    async fn replace(&self, id: &CredentialId, document: Document) -> Result<(), StoreError>;

    /// Remove a document. Returns whether it existed.
    async fn remove(&self, id: &CredentialId) -> Result<bool, StoreError>;

    /// List documents, optionally restricted to one discriminator.
    async fn list(
        &self,
        discriminator: Option<&str>,
    ) -> Result<Vec<(CredentialId, Document)>, StoreError>;
}

/// Check `document`'s unique fields against every other stored document.
pub(crate) fn check_unique<'a>(
    existing: impl IntoIterator<Item = (&'a CredentialId, &'a Document)>,
    id: &CredentialId,
    document: &Document,
) -> Result<(), StoreError> {
    if document.unique.is_empty() {
        return Ok(());
    }

    for (other_id, other) in existing {
        if other_id == id || other.discriminator != document.discriminator {
            continue;
        }
        for field in &document.unique {
            let Some(value) = document.fields.get(field) else {
                continue;
            };
            if other.fields.get(field) == Some(value) {
                return Err(StoreError::UniqueViolation {
                    discriminator: document.discriminator.clone(),
                    field: field.clone(),
                });
            }
        }
    }

    Ok(())
}
