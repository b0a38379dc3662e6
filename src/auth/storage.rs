//! Credential cache storage.
//!
//! The resolver reads the cache at the start of each resolution and
//! overwrites it whenever a new or refreshed credential is produced. There
//! is no locking: two processes refreshing against the same file can race,
//! and the last writer wins.

use crate::errors::CredentialError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Byte-level access to credential cache locations.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Reads the cache at `location`. A missing file is `Ok(None)`.
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, CredentialError>;

    /// Overwrites the cache at `location`.
    async fn write(&self, location: &Path, contents: &[u8]) -> Result<(), CredentialError>;
}

/// Store backed by the local file system.
#[derive(Debug, Default, Clone)]
pub struct FileCredentialStore;

impl FileCredentialStore {
    /// Create a new file store.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, CredentialError> {
        match tokio::fs::read(location).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CredentialError::Storage(format!(
                "cannot read {}: {}",
                location.display(),
                e
            ))),
        }
    }

    async fn write(&self, location: &Path, contents: &[u8]) -> Result<(), CredentialError> {
        if let Some(parent) = location.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CredentialError::Storage(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(location, contents).await.map_err(|e| {
            CredentialError::Storage(format!("cannot write {}: {}", location.display(), e))
        })
    }
}

/// In-memory store, useful for tests and ephemeral environments.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    write_history: Mutex<Vec<PathBuf>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `location` with `contents`.
    pub fn insert(&self, location: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.lock_files().insert(location.into(), contents.into());
    }

    /// Current contents of `location`.
    pub fn get(&self, location: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock_files().get(location.as_ref()).cloned()
    }

    /// Locations written so far, in order.
    pub fn write_history(&self) -> Vec<PathBuf> {
        self.write_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn read(&self, location: &Path) -> Result<Option<Vec<u8>>, CredentialError> {
        Ok(self.lock_files().get(location).cloned())
    }

    async fn write(&self, location: &Path, contents: &[u8]) -> Result<(), CredentialError> {
        self.lock_files()
            .insert(location.to_path_buf(), contents.to_vec());
        self.write_history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(location.to_path_buf());
        Ok(())
    }
}
