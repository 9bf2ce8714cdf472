//! Whole-value documents kept under a single key
//!
//! The file index and the activity log are each one JSON value. Updates are
//! read-modify-write guarded by the store's version check: when another
//! writer got in between, the mutation is re-applied to the fresh value.

use serde::Serialize;
use serde::de::DeserializeOwned;

use tenantvault_core::{Error, KeyValueStore, Result};

/// Attempts before an update gives up on a contended document
pub(crate) const MAX_CAS_ATTEMPTS: usize = 16;

/// Load a document; an absent key is the empty document
pub(crate) async fn load<T>(kv: &dyn KeyValueStore, key: &str) -> Result<(T, Option<u64>)>
where
    T: DeserializeOwned + Default,
{
    match kv.get_versioned(key).await? {
        Some(stored) => Ok((serde_json::from_slice(&stored.value)?, Some(stored.version))),
        None => Ok((T::default(), None)),
    }
}

/// Apply `mutate` to the document under `key` and write it back.
///
/// `mutate` returns whether it changed anything; unchanged documents are not
/// written. It may run more than once, each time on a freshly loaded value.
/// Returns whether a write happened.
pub(crate) async fn update<T, F>(kv: &dyn KeyValueStore, key: &str, mut mutate: F) -> Result<bool>
where
    T: Serialize + DeserializeOwned + Default,
    F: FnMut(&mut T) -> bool,
{
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let (mut document, version) = load::<T>(kv, key).await?;
        if !mutate(&mut document) {
            return Ok(false);
        }

        let encoded = serde_json::to_vec(&document)?;
        if kv.put_if_version(key, encoded, version).await? {
            return Ok(true);
        }
        tracing::debug!(key, attempt, "Document changed concurrently, re-reading");
    }

    Err(Error::Conflict {
        key: key.to_string(),
        attempts: MAX_CAS_ATTEMPTS,
    })
}
