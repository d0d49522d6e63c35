//! In-memory document storage implementation.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{Document, DocumentStore, StoreError, check_unique};
use crate::model::CredentialId;

/// In-memory document store for testing and development.
///
/// This store is not persistent; data is lost when the process exits.
/// Encryption tags are recorded but values are held as-is.
pub struct MemoryDocumentStore {
    data: RwLock<HashMap<CredentialId, Document>>,
}

impl MemoryDocumentStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocumentStore")
            .field("documents", &self.len())
            .finish()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, id: &CredentialId, document: Document) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.contains_key(id) {
            return Err(StoreError::AlreadyExists { id: id.to_string() });
        }
        check_unique(data.iter(), id, &document)?;
        data.insert(id.clone(), document);
        Ok(())
    }

    async fn get(&self, id: &CredentialId) -> Result<Option<Document>, StoreError> {
        Ok(self.data.read().get(id).cloned())
    }

    async fn replace(&self, id: &CredentialId, document: Document) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if !data.contains_key(id) {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        check_unique(data.iter(), id, &document)?;
        data.insert(id.clone(), document);
        Ok(())
    }

    async fn remove(&self, id: &CredentialId) -> Result<bool, StoreError> {
        Ok(self.data.write().remove(id).is_some())
    }

    async fn list(
        &self,
        discriminator: Option<&str>,
    ) -> Result<Vec<(CredentialId, Document)>, StoreError> {
        let data = self.data.read();
        Ok(data
            .iter()
            .filter(|(_, doc)| discriminator.is_none_or(|d| doc.discriminator == d))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }
}
