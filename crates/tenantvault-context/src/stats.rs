//! Aggregate statistics derived from the file index and activity log

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use tenantvault_core::Result;

use crate::activity::ActivityEntry;
use crate::index::{self, FileRecord};
use crate::{ACTIVITY_LOG_KEY, FILE_INDEX_KEY, LIVE_SCAN_LIMIT, TenantContext, document};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub files: FileStats,
    pub activity: ActivityStats,
    pub storage: LiveCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub count: usize,
    pub total_size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityStats {
    pub total_operations: usize,
    pub last_activity: LastActivity,
}

/// Timestamp of the newest activity entry; serialized as `"never"` when the
/// log is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LastActivity {
    Never,
    At(DateTime<Utc>),
}

impl Serialize for LastActivity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LastActivity::Never => serializer.serialize_str("never"),
            LastActivity::At(at) => {
                serializer.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
        }
    }
}

/// Entry counts read directly from the backends, each capped at
/// [`LIVE_SCAN_LIMIT`]. The key count includes bookkeeping keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LiveCounts {
    pub keys: usize,
    pub objects: usize,
}

impl TenantContext {
    /// Aggregate statistics for the tenant.
    ///
    /// Failing to read the index or the log fails the call. The live counts
    /// are a cross-check only and fall back to zero.
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn get_stats(&self) -> Result<StatsSnapshot> {
        let ((files, _), (log, _)) = futures::try_join!(
            document::load::<Vec<FileRecord>>(self.kv(), FILE_INDEX_KEY),
            document::load::<Vec<ActivityEntry>>(self.kv(), ACTIVITY_LOG_KEY),
        )?;

        let (keys, objects) = futures::join!(
            self.kv().count(LIVE_SCAN_LIMIT),
            self.bindings.blobs.count(LIVE_SCAN_LIMIT),
        );
        let storage = LiveCounts {
            keys: keys.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Live key count unavailable");
                0
            }),
            objects: objects.unwrap_or_else(|err| {
                tracing::warn!(error = %err, "Live object count unavailable");
                0
            }),
        };

        Ok(StatsSnapshot {
            files: FileStats {
                count: files.len(),
                total_size: index::total_size(&files),
            },
            activity: ActivityStats {
                total_operations: log.len(),
                last_activity: log
                    .last()
                    .map_or(LastActivity::Never, |entry| LastActivity::At(entry.timestamp)),
            },
            storage,
        })
    }
}
