//! Store wrappers for failure injection in tests

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tenantvault_core::{
    BlobMeta, BlobObject, BlobStore, Error, KeyValueStore, Result, TenantBindings, TenantId,
    Versioned,
};
use tenantvault_storage::{MemoryBlobStore, MemoryKeyValueStore};

use crate::TenantContext;

pub(crate) fn context_with(
    tenant: &str,
    kv: Arc<dyn KeyValueStore>,
    blobs: Arc<dyn BlobStore>,
) -> TenantContext {
    TenantContext::new(TenantBindings::new(
        TenantId::from_string(tenant).unwrap(),
        kv,
        blobs,
    ))
}

pub(crate) fn memory_context(tenant: &str) -> TenantContext {
    context_with(
        tenant,
        Arc::new(MemoryKeyValueStore::new()),
        Arc::new(MemoryBlobStore::new()),
    )
}

fn injected(what: &str) -> Error {
    Error::Storage(format!("injected {what} failure"))
}

/// Simulates one competing writer on `key`: the first compare-and-swap
/// against `key` is preceded by an unconditional write of `injected`.
pub(crate) struct InterleavingKv<S> {
    inner: S,
    key: String,
    injected: Vec<u8>,
    interleaved: AtomicUsize,
}

impl<S> InterleavingKv<S> {
    pub(crate) fn new(inner: S, key: &str, injected: Vec<u8>) -> Self {
        Self {
            inner,
            key: key.to_string(),
            injected,
            interleaved: AtomicUsize::new(0),
        }
    }

    pub(crate) fn interleaved(&self) -> usize {
        self.interleaved.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: KeyValueStore> KeyValueStore for InterleavingKv<S> {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>> {
        self.inner.get_versioned(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        self.inner.put(key, value).await
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool> {
        if key == self.key
            && self
                .interleaved
                .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.inner.put(key, self.injected.clone()).await?;
        }
        self.inner.put_if_version(key, value, expected).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, Vec<u8>)>> {
        self.inner.list(prefix, limit).await
    }
}

/// Which key-value operations should fail
#[derive(Debug, Clone, Default)]
pub(crate) struct KvFaults {
    /// Fail writes (put, compare-and-swap, delete) to this key only
    pub(crate) write_key: Option<String>,
    /// Fail reads of this key only
    pub(crate) read_key: Option<String>,
    /// Fail list/count scans
    pub(crate) listing: bool,
}

#[derive(Default)]
pub(crate) struct FaultyKv {
    inner: MemoryKeyValueStore,
    faults: Mutex<KvFaults>,
}

impl FaultyKv {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_faults(&self, faults: KvFaults) {
        *self.faults.lock().unwrap() = faults;
    }

    fn faults(&self) -> KvFaults {
        self.faults.lock().unwrap().clone()
    }

    fn check_write(&self, key: &str) -> Result<()> {
        if self.faults().write_key.as_deref() == Some(key) {
            return Err(injected("kv write"));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FaultyKv {
    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>> {
        if self.faults().read_key.as_deref() == Some(key) {
            return Err(injected("kv read"));
        }
        self.inner.get_versioned(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<u64> {
        self.check_write(key)?;
        self.inner.put(key, value).await
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: Vec<u8>,
        expected: Option<u64>,
    ) -> Result<bool> {
        self.check_write(key)?;
        self.inner.put_if_version(key, value, expected).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_write(key)?;
        self.inner.delete(key).await
    }

    async fn list(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<(String, Vec<u8>)>> {
        if self.faults().listing {
            return Err(injected("kv list"));
        }
        self.inner.list(prefix, limit).await
    }
}

#[derive(Default)]
pub(crate) struct FaultyBlobs {
    inner: MemoryBlobStore,
    pub(crate) fail_put: AtomicBool,
    pub(crate) fail_delete: AtomicBool,
    pub(crate) fail_list: AtomicBool,
}

impl FaultyBlobs {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for FaultyBlobs {
    async fn put(&self, key: &str, body: Bytes) -> Result<BlobMeta> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(injected("blob put"));
        }
        self.inner.put(key, body).await
    }

    async fn get(&self, key: &str) -> Result<Option<BlobObject>> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(injected("blob delete"));
        }
        self.inner.delete(key).await
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<BlobMeta>> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(injected("blob list"));
        }
        self.inner.list(limit).await
    }
}
