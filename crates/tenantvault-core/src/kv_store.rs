//! Key-value store trait for per-tenant storage
//!
//! Every tenant owns one `KeyValueStore` instance. The store knows nothing
//! about tenants; isolation comes from never handing tenant A's instance to
//! an operation running for tenant B.

use async_trait::async_trait;

use crate::Result;

/// A stored value together with the version it was written at.
///
/// Versions are assigned by the store on every write and are unique within
/// a store instance, so a key that is deleted and recreated never reuses an
/// earlier version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub value: Vec<u8>,
    pub version: u64,
}

/// Key-value store trait
///
/// Implementations:
/// - `MemoryKeyValueStore`: `BTreeMap` behind an async lock
/// - `FileKeyValueStore`: in-memory map persisted to a JSON snapshot
///
/// # Example
/// ```no_run
/// # use tenantvault_core::kv_store::KeyValueStore;
/// # async fn example(store: &dyn KeyValueStore) -> tenantvault_core::Result<()> {
/// store.put("greeting", b"\"hello\"".to_vec()).await?;
///
/// // Optimistic update: only succeeds if nobody wrote in between
/// if let Some(current) = store.get_versioned("greeting").await? {
///     store
///         .put_if_version("greeting", b"\"hi\"".to_vec(), Some(current.version))
///         .await?;
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get_versioned(key).await?.map(|v| v.value))
    }

    /// Get a value together with its current version
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>>;

    /// Unconditionally write a value, returning the new version
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64>;

    /// Compare-and-swap write
    ///
    /// `expected` is the version the caller last observed, or `None` if the
    /// caller observed the key as absent. Returns `false` without writing if
    /// the current state differs.
    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool>;

    /// Delete a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// List entries whose key starts with `prefix`, in key order
    async fn list(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, Vec<u8>)>>;

    /// List keys starting with `prefix`, in key order
    async fn keys(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        Ok(self
            .list(prefix, limit)
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect())
    }

    /// Count keys, scanning at most `limit` entries
    async fn count(&self, limit: usize) -> Result<usize> {
        Ok(self.keys("", Some(limit)).await?.len())
    }
}
