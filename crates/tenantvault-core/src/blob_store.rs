//! Blob store trait for per-tenant large objects

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    /// Object key
    pub key: String,

    /// Size of the object in bytes
    pub size: u64,

    /// Time of the last write
    pub last_modified: DateTime<Utc>,
}

/// An object read back from the store
#[derive(Debug, Clone)]
pub struct BlobObject {
    pub meta: BlobMeta,
    pub body: Bytes,
}

/// Blob store trait
///
/// Implementations:
/// - `MemoryBlobStore`: objects held in memory
/// - `LocalBlobStore`: one file per object on the local filesystem
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write an object, replacing any previous object under `key`
    async fn put(&self, key: &str, body: Bytes) -> Result<BlobMeta>;

    /// Read an object, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<BlobObject>>;

    /// Delete an object, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List object metadata in key order
    async fn list(&self, limit: Option<usize>) -> Result<Vec<BlobMeta>>;

    /// Count objects, scanning at most `limit`
    async fn count(&self, limit: usize) -> Result<usize> {
        Ok(self.list(Some(limit)).await?.len())
    }
}
