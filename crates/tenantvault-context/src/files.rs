//! File operations: blobs plus the file index that catalogs them

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use chrono::Utc;
use tenantvault_core::{BlobObject, Error, Result};

use crate::index::{self, FileRecord};
use crate::{FILE_INDEX_KEY, LIVE_SCAN_LIMIT, TenantContext, document, require_key};

/// Acknowledgement of a stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub key: String,
    pub size: u64,
}

/// Outcome of rebuilding the file index from the blob store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Blobs that had no index record
    pub added: Vec<String>,
    /// Index records whose blob was gone
    pub removed: Vec<String>,
    /// Index length after reconciliation
    pub total: usize,
    /// The blob listing hit the scan bound; stale records were left alone
    pub truncated: bool,
}

impl TenantContext {
    /// Store `body` under `key` and record it in the file index.
    ///
    /// The blob is written first. If the index cannot be updated afterwards
    /// the blob store is rolled back (the previous body is restored for a
    /// re-upload, a new blob is deleted) and the index error is returned.
    #[tracing::instrument(skip(self, body), fields(tenant = %self.tenant_id(), size = body.len()))]
    pub async fn upload_file(&self, key: &str, body: Bytes) -> Result<UploadReceipt> {
        require_key(key)?;
        let size = body.len() as u64;

        let previous = self.bindings.blobs.get(key).await?;
        self.bindings.blobs.put(key, body).await?;

        let record = FileRecord::new(key, size);
        let indexed = document::update(self.kv(), FILE_INDEX_KEY, |files: &mut Vec<FileRecord>| {
            index::upsert(files, record.clone());
            true
        })
        .await;

        if let Err(err) = indexed {
            self.roll_back_upload(key, previous, &err).await;
            return Err(err);
        }

        tracing::debug!("File stored");
        Ok(UploadReceipt {
            key: key.to_string(),
            size,
        })
    }

    async fn roll_back_upload(&self, key: &str, previous: Option<BlobObject>, err: &Error) {
        let rolled_back = match previous {
            Some(object) => self.bindings.blobs.put(key, object.body).await.map(|_| ()),
            None => self.bindings.blobs.delete(key).await.map(|_| ()),
        };
        match rolled_back {
            Ok(()) => tracing::warn!(error = %err, "File index update failed, blob store rolled back"),
            Err(cleanup) => tracing::error!(
                error = %err,
                cleanup_error = %cleanup,
                "File index update failed and the blob could not be rolled back"
            ),
        }
    }

    /// Blob content for `key`; the index is not consulted
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn get_file(&self, key: &str) -> Result<Option<BlobObject>> {
        require_key(key)?;
        self.bindings.blobs.get(key).await
    }

    /// Delete the blob under `key`, then its index record.
    ///
    /// Returns whether either existed.
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn delete_file(&self, key: &str) -> Result<bool> {
        require_key(key)?;

        let blob_existed = self.bindings.blobs.delete(key).await?;
        let record_existed = document::update(self.kv(), FILE_INDEX_KEY, |files: &mut Vec<FileRecord>| {
            index::remove(files, key)
        })
        .await
        .inspect_err(|err| {
            tracing::warn!(error = %err, "Blob deleted but its index record remains");
        })?;

        Ok(blob_existed || record_existed)
    }

    /// The file index as stored
    pub async fn list_files(&self) -> Result<Vec<FileRecord>> {
        let (files, _) = document::load::<Vec<FileRecord>>(self.kv(), FILE_INDEX_KEY).await?;
        Ok(files)
    }

    /// Bring the file index back in line with the blob store.
    ///
    /// Unindexed blobs are added with their stored size and modification
    /// time. Records without a blob are dropped unless the blob listing was
    /// cut off at the scan bound, in which case absence proves nothing.
    /// Records created after the scan started are always kept: their blob
    /// may have been written after the listing was taken.
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn reconcile_files(&self) -> Result<ReconcileReport> {
        let scan_started = Utc::now();
        let blobs = self.bindings.blobs.list(Some(LIVE_SCAN_LIMIT)).await?;
        let truncated = blobs.len() >= LIVE_SCAN_LIMIT;
        let present: HashSet<&str> = blobs.iter().map(|meta| meta.key.as_str()).collect();

        let mut report = ReconcileReport::default();
        document::update(self.kv(), FILE_INDEX_KEY, |files: &mut Vec<FileRecord>| {
            let mut removed = Vec::new();
            if !truncated {
                files.retain(|record| {
                    let keep = present.contains(record.key.as_str())
                        || record.uploaded_at >= scan_started;
                    if !keep {
                        removed.push(record.key.clone());
                    }
                    keep
                });
            }

            let indexed: HashSet<String> = files.iter().map(|record| record.key.clone()).collect();
            let mut added = Vec::new();
            for meta in blobs.iter().filter(|meta| !indexed.contains(&meta.key)) {
                files.push(FileRecord {
                    key: meta.key.clone(),
                    size: meta.size,
                    uploaded_at: meta.last_modified,
                });
                added.push(meta.key.clone());
            }

            let changed = !added.is_empty() || !removed.is_empty();
            report = ReconcileReport {
                added,
                removed,
                total: files.len(),
                truncated,
            };
            changed
        })
        .await?;

        if !report.added.is_empty() || !report.removed.is_empty() {
            tracing::info!(
                added = report.added.len(),
                removed = report.removed.len(),
                "File index reconciled"
            );
        }
        Ok(report)
    }
}
