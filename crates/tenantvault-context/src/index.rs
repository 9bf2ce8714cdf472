//! File index: one record per blob a tenant has stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub key: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
            uploaded_at: Utc::now(),
        }
    }
}

/// Insert `record`, replacing any record with the same key. The new record
/// always ends up last.
pub(crate) fn upsert(index: &mut Vec<FileRecord>, record: FileRecord) {
    index.retain(|existing| existing.key != record.key);
    index.push(record);
}

/// Drop every record for `key`; returns whether any was present
pub(crate) fn remove(index: &mut Vec<FileRecord>, key: &str) -> bool {
    let before = index.len();
    index.retain(|record| record.key != key);
    index.len() != before
}

pub(crate) fn total_size(index: &[FileRecord]) -> u64 {
    index.iter().map(|record| record.size).sum()
}
