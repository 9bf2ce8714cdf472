//! File-backed key-value store
//!
//! Keeps the tenant's entries in memory and writes the whole map through to
//! a JSON snapshot after every mutation. Snapshot writes are atomic, so a
//! crash leaves either the previous or the new snapshot on disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use tenantvault_core::{KeyValueStore, Result, Versioned};

use crate::atomic_writer::write_atomic;
use crate::error::{StorageError, StorageResult};
use crate::memory::KvState;

pub struct FileKeyValueStore {
    path: PathBuf,
    state: RwLock<KvState>,
}

impl FileKeyValueStore {
    /// Open a store, loading an existing snapshot if present
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();

        let state = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                StorageError::Serialization(format!(
                    "Failed to load snapshot {}: {}",
                    path.display(),
                    e
                ))
            })?
        } else {
            KvState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Must be called with the write lock held so snapshots are never interleaved
    fn persist(&self, state: &KvState) -> StorageResult<()> {
        let content = serde_json::to_vec(state)
            .map_err(|e| StorageError::Serialization(format!("Failed to serialize state: {}", e)))?;
        write_atomic(&self.path, &content)
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.state.read().await.get(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        let mut state = self.state.write().await;
        let previous = state.get(key);
        let version = state.put(key, value);

        if let Err(e) = self.persist(&state) {
            // Keep memory and disk in agreement
            state.restore(key, previous);
            tracing::error!(path = %self.path.display(), "Failed to persist snapshot: {}", e);
            return Err(e.into());
        }
        Ok(version)
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        let previous = state.get(key);
        if state.put_if_version(key, value, expected).is_none() {
            return Ok(false);
        }

        if let Err(e) = self.persist(&state) {
            state.restore(key, previous);
            tracing::error!(path = %self.path.display(), "Failed to persist snapshot: {}", e);
            return Err(e.into());
        }
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(previous) = state.get(key) else {
            return Ok(false);
        };
        state.remove(key);

        if let Err(e) = self.persist(&state) {
            state.restore(key, Some(previous));
            tracing::error!(path = %self.path.display(), "Failed to persist snapshot: {}", e);
            return Err(e.into());
        }
        Ok(true)
    }

    async fn list(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self.state.read().await.list(prefix, limit))
    }
}
