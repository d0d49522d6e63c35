//! JSON-file document storage.
//!
//! Documents live in a single JSON file, `credentials.json` in the platform
//! data directory by default (`~/.local/share/apiforge` on Linux). The whole
//! file is rewritten on every change through a temporary file and rename.
//!
//! Values of encrypted fields are written as given: this backend is meant
//! for local development. On Unix the file is created with mode `0600` so
//! only the owning user can read it.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Document, DocumentStore, StoreError, check_unique};
use crate::model::CredentialId;

/// File name used inside the data directory.
pub const DEFAULT_FILE_NAME: &str = "credentials.json";

/// On-disk format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileData {
    /// Version of the store format (for future migrations).
    version: u32,

    documents: BTreeMap<CredentialId, Document>,
}

impl Default for FileData {
    fn default() -> Self {
        Self {
            version: 1,
            documents: BTreeMap::new(),
        }
    }
}

/// Disk-backed document store.
///
/// Holds the file contents in memory and writes through on every change.
/// Writes are synchronous and happen under the write lock, which keeps the
/// file and the in-memory copy in step. Move them onto `spawn_blocking` if
/// one store is ever shared by many concurrent tasks.
pub struct FileDocumentStore {
    path: PathBuf,
    data: RwLock<FileData>,
}

impl FileDocumentStore {
    /// Default location of the credentials file.
    pub fn default_path() -> Result<PathBuf, StoreError> {
        let dirs = directories::ProjectDirs::from("com", "apiforge", "apiforge")
            .ok_or(StoreError::DataDirUnavailable)?;
        Ok(dirs.data_dir().join(DEFAULT_FILE_NAME))
    }

    /// Open the store at the default location.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path()?)
    }

    /// Open the store at a specific path.
    ///
    /// Creates parent directories if they don't exist. A missing file is
    /// treated as an empty store and created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                FileData::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            FileData::default()
        };

        tracing::debug!("Opened credential file {:?} ({} records)", path, data.documents.len());

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &FileData) -> Result<(), StoreError> {
        let contents = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;

        // Owner-only before the rename
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl std::fmt::Debug for FileDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDocumentStore")
            .field("path", &self.path)
            .finish()
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn insert(&self, id: &CredentialId, document: Document) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.documents.contains_key(id) {
            return Err(StoreError::AlreadyExists { id: id.to_string() });
        }
        check_unique(data.documents.iter(), id, &document)?;
        data.documents.insert(id.clone(), document);
        if let Err(e) = self.persist(&data) {
            data.documents.remove(id);
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, id: &CredentialId) -> Result<Option<Document>, StoreError> {
        Ok(self.data.read().documents.get(id).cloned())
    }

    async fn replace(&self, id: &CredentialId, document: Document) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if !data.documents.contains_key(id) {
            return Err(StoreError::NotFound { id: id.to_string() });
        }
        check_unique(data.documents.iter(), id, &document)?;
        let previous = data.documents.insert(id.clone(), document);
        if let Err(e) = self.persist(&data) {
            if let Some(previous) = previous {
                data.documents.insert(id.clone(), previous);
            }
            return Err(e);
        }
        Ok(())
    }

    async fn remove(&self, id: &CredentialId) -> Result<bool, StoreError> {
        let mut data = self.data.write();
        let Some(previous) = data.documents.remove(id) else {
            return Ok(false);
        };
        if let Err(e) = self.persist(&data) {
            data.documents.insert(id.clone(), previous);
            return Err(e);
        }
        Ok(true)
    }

    async fn list(
        &self,
        discriminator: Option<&str>,
    ) -> Result<Vec<(CredentialId, Document)>, StoreError> {
        let data = self.data.read();
        Ok(data
            .documents
            .iter()
            .filter(|(_, doc)| discriminator.is_none_or(|d| doc.discriminator == d))
            .map(|(id, doc)| (id.clone(), doc.clone()))
            .collect())
    }
}
