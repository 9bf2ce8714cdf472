//! TenantVault Tenant Context
//!
//! The stateless operation façade run for one tenant per invocation:
//! - File operations backed by the tenant's blob store, with a file index
//! - Data operations backed by the tenant's key-value store
//! - A bounded activity log of data operations
//! - Aggregate statistics
//!
//! A [`TenantContext`] holds nothing but the tenant's bindings. Every call
//! rehydrates whatever it needs from storage, so contexts can be created per
//! request and dropped afterwards.

pub mod activity;
mod data;
mod document;
mod files;
pub mod index;
mod stats;

#[cfg(test)]
mod testing;

use tenantvault_core::{Error, KeyValueStore, Result, TenantBindings, TenantId};

pub use activity::{ActivityAction, ActivityEntry, MAX_ACTIVITY_ENTRIES};
pub use data::{DataEntry, DataOutcome};
pub use files::{ReconcileReport, UploadReceipt};
pub use index::FileRecord;
pub use stats::{ActivityStats, FileStats, LastActivity, LiveCounts, StatsSnapshot};

/// Key holding the serialized file index
pub const FILE_INDEX_KEY: &str = "files:list";

/// Key holding the serialized activity log
pub const ACTIVITY_LOG_KEY: &str = "activity:log";

/// Prefixes reserved for bookkeeping; tenant data may not use them
pub const RESERVED_PREFIXES: [&str; 2] = ["files:", "activity:"];

/// Upper bound on entries scanned when counting or reconciling live storage
pub const LIVE_SCAN_LIMIT: usize = 1000;

/// Whether `key` falls under a bookkeeping prefix
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_PREFIXES.iter().any(|prefix| key.starts_with(prefix))
}

/// Operation façade bound to one tenant's storage
#[derive(Clone, Debug)]
pub struct TenantContext {
    bindings: TenantBindings,
}

impl TenantContext {
    pub fn new(bindings: TenantBindings) -> Self {
        Self { bindings }
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.bindings.tenant_id
    }

    pub fn bindings(&self) -> &TenantBindings {
        &self.bindings
    }

    fn kv(&self) -> &dyn KeyValueStore {
        self.bindings.kv.as_ref()
    }
}

fn require_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidRequest("key must not be empty".to_string()));
    }
    Ok(())
}
