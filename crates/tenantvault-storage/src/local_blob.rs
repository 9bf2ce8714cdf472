//! Local filesystem blob store
//!
//! One file per object under a tenant-owned directory. File names are the
//! base64url encoding of the object key, so keys containing `/` or `..`
//! can never escape the directory. Keys longer than [`MAX_KEY_BYTES`] are
//! rejected, since their encoded name (plus the temp suffix used while
//! writing) would exceed the 255-byte file name limit of common filesystems.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tenantvault_core::{BlobMeta, BlobObject, BlobStore, Error, Result};

use crate::atomic_writer::{is_temp_file, write_atomic};
use crate::error::{StorageError, StorageResult};

/// Longest key, in bytes, the local backend can store
pub const MAX_KEY_BYTES: usize = 160;

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(root: P) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf> {
        if key.len() > MAX_KEY_BYTES {
            return Err(Error::InvalidRequest(format!(
                "key is {} bytes; the local backend accepts at most {}",
                key.len(),
                MAX_KEY_BYTES
            )));
        }
        Ok(self.root.join(URL_SAFE_NO_PAD.encode(key.as_bytes())))
    }

    fn decode_name(name: &str) -> Option<String> {
        let raw = URL_SAFE_NO_PAD.decode(name.as_bytes()).ok()?;
        String::from_utf8(raw).ok()
    }

    fn meta_from(key: String, metadata: &std::fs::Metadata) -> BlobMeta {
        let last_modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());
        BlobMeta {
            key,
            size: metadata.len(),
            last_modified,
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, body: Bytes) -> Result<BlobMeta> {
        let path = self.object_path(key)?;
        let data = body.clone();
        let written = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&written, &data))
            .await
            .map_err(|e| StorageError::InvalidData(format!("Blob write task failed: {}", e)))??;

        let metadata = tokio::fs::metadata(&path).await.map_err(StorageError::from)?;
        Ok(Self::meta_from(key.to_string(), &metadata))
    }

    async fn get(&self, key: &str) -> Result<Option<BlobObject>> {
        let path = self.object_path(key)?;
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::Io(e).into()),
        };
        let metadata = tokio::fs::metadata(&path).await.map_err(StorageError::from)?;

        Ok(Some(BlobObject {
            meta: Self::meta_from(key.to_string(), &metadata),
            body: Bytes::from(body),
        }))
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.object_path(key)?).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e).into()),
        }
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<BlobMeta>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .map_err(StorageError::from)?;

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::from)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_temp_file(&name) {
                continue;
            }
            let Some(key) = Self::decode_name(&name) else {
                tracing::warn!(root = %self.root.display(), file = %name, "Skipping unrecognized file in blob directory");
                continue;
            };
            let metadata = entry.metadata().await.map_err(StorageError::from)?;
            if metadata.is_file() {
                objects.push(Self::meta_from(key, &metadata));
            }
        }

        // Directory order is unspecified; sort before truncating so the scan bound is deterministic
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        if let Some(limit) = limit {
            objects.truncate(limit);
        }
        Ok(objects)
    }
}
