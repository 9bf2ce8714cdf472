//! Data operations on the tenant's key-value store
//!
//! Every set/get/delete also appends to the activity log. The append is best
//! effort: its failure never turns a completed data operation into an error,
//! it is reported next to the result instead.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use tenantvault_core::{Error, Result};

use crate::activity::{self, ActivityAction, ActivityEntry};
use crate::{ACTIVITY_LOG_KEY, TenantContext, document, is_reserved_key, require_key};

/// Result of a data operation plus any activity-log failure
#[derive(Debug, Clone, PartialEq)]
pub struct DataOutcome<T> {
    pub value: T,
    pub activity_warning: Option<String>,
}

/// A tenant key with its stored JSON value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub key: String,
    pub value: Value,
}

fn require_data_key(key: &str) -> Result<()> {
    require_key(key)?;
    if is_reserved_key(key) {
        return Err(Error::InvalidRequest(format!(
            "key '{}' uses a reserved prefix",
            key
        )));
    }
    Ok(())
}

impl TenantContext {
    #[tracing::instrument(skip(self, value), fields(tenant = %self.tenant_id()))]
    pub async fn set_data(&self, key: &str, value: &Value) -> Result<DataOutcome<()>> {
        require_data_key(key)?;

        let encoded = serde_json::to_vec(value)?;
        self.kv().put(key, encoded).await?;

        Ok(DataOutcome {
            value: (),
            activity_warning: self.record_activity(ActivityAction::Set, key).await,
        })
    }

    /// Stored value for `key`, `None` when absent. Logged either way.
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn get_data(&self, key: &str) -> Result<DataOutcome<Option<Value>>> {
        require_data_key(key)?;

        let value = match self.kv().get(key).await? {
            Some(raw) => Some(serde_json::from_slice(&raw)?),
            None => None,
        };

        Ok(DataOutcome {
            value,
            activity_warning: self.record_activity(ActivityAction::Get, key).await,
        })
    }

    /// Returns whether the key existed
    #[tracing::instrument(skip(self), fields(tenant = %self.tenant_id()))]
    pub async fn delete_data(&self, key: &str) -> Result<DataOutcome<bool>> {
        require_data_key(key)?;

        let existed = self.kv().delete(key).await?;

        Ok(DataOutcome {
            value: existed,
            activity_warning: self.record_activity(ActivityAction::Delete, key).await,
        })
    }

    /// All tenant data entries in key order, bookkeeping keys excluded
    pub async fn list_data(&self) -> Result<Vec<DataEntry>> {
        self.kv()
            .list("", None)
            .await?
            .into_iter()
            .filter(|(key, _)| !is_reserved_key(key))
            .map(|(key, raw)| -> Result<DataEntry> {
                Ok(DataEntry {
                    key,
                    value: serde_json::from_slice(&raw)?,
                })
            })
            .collect()
    }

    /// The activity log, oldest entry first
    pub async fn recent_activity(&self) -> Result<Vec<ActivityEntry>> {
        let (log, _) = document::load::<Vec<ActivityEntry>>(self.kv(), ACTIVITY_LOG_KEY).await?;
        Ok(log)
    }

    async fn record_activity(&self, action: ActivityAction, key: &str) -> Option<String> {
        let appended = document::update(self.kv(), ACTIVITY_LOG_KEY, |log: &mut Vec<ActivityEntry>| {
            activity::push_bounded(log, ActivityEntry::new(action, key));
            true
        })
        .await;

        match appended {
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(%action, error = %err, "Failed to record activity");
                Some(format!("activity log not updated: {}", err))
            }
        }
    }
}
