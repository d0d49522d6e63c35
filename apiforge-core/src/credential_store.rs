//! Credential persistence on top of a [`DocumentStore`].
//!
//! [`CredentialStore`] turns a [`CredentialRecord`] into a [`Document`],
//! tagging the fields the backend must encrypt and the fields that must stay
//! unique, and turns documents back into records on read.
//!
//! # Example
//!
//! ```rust,ignore
//! use apiforge_core::{Credential, CredentialRecord, CredentialStore, MemoryDocumentStore};
//!
//! let store = CredentialStore::new(MemoryDocumentStore::new());
//! let id = store.save(&CredentialRecord::Slack(Credential::new("xoxb-..."))).await?;
//! let record = store.load(&id).await?;
//! store.delete(&id).await?;
//! ```

use serde_json::Value;
use tracing::{debug, info};

use crate::credential::CredentialRecord;
use crate::error::ApiforgeError;
use crate::model::{CredentialId, VendorId};
use crate::store::{Document, DocumentStore, StoreError};

/// Persists credential records through a document store backend.
pub struct CredentialStore<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> CredentialStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying backend.
    pub fn backend(&self) -> &S {
        &self.store
    }

    /// Build the stored document for a record.
    ///
    /// String fields are trimmed, and the record's encrypted and unique
    /// field tags are attached.
    pub fn to_document(record: &CredentialRecord) -> Result<Document, StoreError> {
        let Value::Object(fields) = serde_json::to_value(record.trimmed())? else {
            return Err(StoreError::BackendError {
                message: format!("{} did not serialize to an object", record.discriminator()),
            });
        };

        let mut document = Document::new(record.discriminator());
        document.fields = fields;
        document.encrypted = record
            .encrypted_fields()
            .iter()
            .map(|f| f.to_string())
            .collect();
        document.unique = record.unique_fields().iter().map(|f| f.to_string()).collect();

        Ok(document)
    }

    /// Rebuild a record from its stored document.
    pub fn from_document(document: Document) -> Result<CredentialRecord, StoreError> {
        let discriminator = document.discriminator.clone();
        let record: CredentialRecord = serde_json::from_value(Value::Object(document.fields))?;
        if record.discriminator() != discriminator {
            return Err(StoreError::BackendError {
                message: format!(
                    "stored discriminator {} does not match record {}",
                    discriminator,
                    record.discriminator()
                ),
            });
        }
        Ok(record)
    }

    /// Persist a new record and return its ID.
    pub async fn save(&self, record: &CredentialRecord) -> Result<CredentialId, ApiforgeError> {
        record.validate()?;
        let id = CredentialId::generate();
        self.store.insert(&id, Self::to_document(record)?).await?;

        info!("Saved {} credential {}", record.vendor(), id);
        Ok(id)
    }

    /// Load a record.
    pub async fn load(&self, id: &CredentialId) -> Result<CredentialRecord, ApiforgeError> {
        let document = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok(Self::from_document(document)?)
    }

    /// Replace a stored record, e.g. after a token refresh.
    pub async fn update(
        &self,
        id: &CredentialId,
        record: &CredentialRecord,
    ) -> Result<(), ApiforgeError> {
        record.validate()?;
        self.store.replace(id, Self::to_document(record)?).await?;

        debug!("Updated {} credential {}", record.vendor(), id);
        Ok(())
    }

    /// Delete a record.
    pub async fn delete(&self, id: &CredentialId) -> Result<(), ApiforgeError> {
        if !self.store.remove(id).await? {
            return Err(StoreError::NotFound { id: id.to_string() }.into());
        }

        info!("Deleted credential {}", id);
        Ok(())
    }

    /// List records, optionally only those of one vendor.
    pub async fn list(
        &self,
        vendor: Option<&VendorId>,
    ) -> Result<Vec<(CredentialId, CredentialRecord)>, ApiforgeError> {
        let mut records = Vec::new();
        for (id, document) in self.store.list(None).await? {
            let record = Self::from_document(document)?;
            if vendor.is_none_or(|v| &record.vendor() == v) {
                records.push((id, record));
            }
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }
}
