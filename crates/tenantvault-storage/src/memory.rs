//! In-memory key-value and blob stores
//!
//! Not persistent; every store instance is its own namespace. Used for the
//! `memory` backend and throughout the test suites.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use tenantvault_core::{BlobMeta, BlobObject, BlobStore, KeyValueStore, Result, Versioned};

/// A versioned entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Entry {
    #[serde(with = "base64_bytes")]
    pub(crate) value: Vec<u8>,
    pub(crate) version: u64,
}

/// Map plus version counter shared by the memory and file-backed stores
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct KvState {
    entries: BTreeMap<String, Entry>,
    last_version: u64,
}

impl KvState {
    fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    pub(crate) fn get(&self, key: &str) -> Option<Versioned> {
        self.entries.get(key).map(|entry| Versioned {
            value: entry.value.clone(),
            version: entry.version,
        })
    }

    pub(crate) fn put(&mut self, key: &str, value: Vec<u8>) -> u64 {
        let version = self.next_version();
        self.entries
            .insert(key.to_string(), Entry { value, version });
        version
    }

    /// Returns `None` if the observed version is stale
    pub(crate) fn put_if_version(
        &mut self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Option<u64> {
        let current = self.entries.get(key).map(|entry| entry.version);
        if current != expected {
            return None;
        }
        Some(self.put(key, value))
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Put back the exact entry observed before a failed mutation.
    /// `last_version` is left advanced so versions stay unique.
    pub(crate) fn restore(&mut self, key: &str, previous: Option<Versioned>) {
        match previous {
            Some(prev) => {
                self.entries.insert(
                    key.to_string(),
                    Entry {
                        value: prev.value,
                        version: prev.version,
                    },
                );
            }
            None => {
                self.entries.remove(key);
            }
        }
    }

    pub(crate) fn list(&self, prefix: &str, limit: Option<usize>) -> Vec<(String, Vec<u8>)> {
        self.entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(limit.unwrap_or(usize::MAX))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }
}

/// In-memory key-value store
///
/// ## Example
/// ```rust
/// use tenantvault_core::KeyValueStore;
/// use tenantvault_storage::MemoryKeyValueStore;
///
/// # async fn example() -> tenantvault_core::Result<()> {
/// let kv = MemoryKeyValueStore::new();
/// kv.put("key", b"value".to_vec()).await?;
/// assert_eq!(kv.get("key").await?, Some(b"value".to_vec()));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryKeyValueStore {
    state: Arc<RwLock<KvState>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>> {
        Ok(self.state.read().await.get(key))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        Ok(self.state.write().await.put(key, value))
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .put_if_version(key, value, expected)
            .is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.state.write().await.remove(key))
    }

    async fn list(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self.state.read().await.list(prefix, limit))
    }
}

/// In-memory blob store
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    objects: Arc<RwLock<BTreeMap<String, BlobObject>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<BlobMeta> {
        let meta = BlobMeta {
            key: key.to_string(),
            size: body.len() as u64,
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(
            key.to_string(),
            BlobObject {
                meta: meta.clone(),
                body,
            },
        );
        Ok(meta)
    }

    async fn get(&self, key: &str) -> Result<Option<BlobObject>> {
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.objects.write().await.remove(key).is_some())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<BlobMeta>> {
        Ok(self
            .objects
            .read()
            .await
            .values()
            .take(limit.unwrap_or(usize::MAX))
            .map(|object| object.meta.clone())
            .collect())
    }
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
