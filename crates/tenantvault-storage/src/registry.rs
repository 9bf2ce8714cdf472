//! Tenant → storage binding registry
//!
//! The registry is the only in-process state shared across requests. It maps
//! each tenant ID to the pair of stores that tenant owns, creating the pair
//! through a [`BindingFactory`] the first time a tenant is seen.

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tenantvault_core::{Error, Result, TenantBindings, TenantId};

use crate::config::{StorageConfig, TenantsConfig};
use crate::error::StorageResult;
use crate::file_kv::FileKeyValueStore;
use crate::local_blob::LocalBlobStore;
use crate::memory::{MemoryBlobStore, MemoryKeyValueStore};

/// Creates a fresh, disjoint pair of stores for one tenant
#[async_trait]
pub trait BindingFactory: Send + Sync {
    async fn create(&self, tenant_id: &TenantId) -> StorageResult<TenantBindings>;

    /// Human-readable backend description for diagnostics
    fn describe(&self) -> String;

    /// Whether new bindings can currently be created
    fn is_available(&self) -> bool {
        true
    }
}

/// In-memory namespaces, lost on restart
pub struct MemoryBindingFactory;

#[async_trait]
impl BindingFactory for MemoryBindingFactory {
    async fn create(&self, tenant_id: &TenantId) -> StorageResult<TenantBindings> {
        Ok(TenantBindings::new(
            tenant_id.clone(),
            Arc::new(MemoryKeyValueStore::new()),
            Arc::new(MemoryBlobStore::new()),
        ))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Per-tenant directories under a shared root:
/// `<root>/<base64url(tenant)>/kv.json` and `<root>/<base64url(tenant)>/blobs/`
pub struct LocalBindingFactory {
    root: PathBuf,
}

impl LocalBindingFactory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn tenant_dir(&self, tenant_id: &TenantId) -> PathBuf {
        self.root
            .join(URL_SAFE_NO_PAD.encode(tenant_id.as_str().as_bytes()))
    }
}

#[async_trait]
impl BindingFactory for LocalBindingFactory {
    async fn create(&self, tenant_id: &TenantId) -> StorageResult<TenantBindings> {
        let dir = self.tenant_dir(tenant_id);
        let tenant = tenant_id.clone();
        tokio::task::spawn_blocking(move || -> StorageResult<TenantBindings> {
            std::fs::create_dir_all(&dir)?;
            let kv = FileKeyValueStore::open(dir.join("kv.json"))?;
            let blobs = LocalBlobStore::open(dir.join("blobs"))?;
            Ok(TenantBindings::new(tenant, Arc::new(kv), Arc::new(blobs)))
        })
        .await
        .map_err(|e| std::io::Error::other(format!("binding task failed: {}", e)))?
    }

    fn describe(&self) -> String {
        format!("local filesystem at {}", self.root.display())
    }

    fn is_available(&self) -> bool {
        self.root.is_dir()
    }
}

/// Which tenants the registry will route
#[derive(Debug, Clone)]
pub enum Provisioning {
    OnDemand,
    Static(HashSet<TenantId>),
}

/// How a resolution was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Bindings already existed for the tenant
    Cached,
    /// Bindings were created by this call
    Created,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Cached => "cached",
            Resolution::Created => "created",
        }
    }
}

pub struct BindingRegistry {
    factory: Arc<dyn BindingFactory>,
    provisioning: Provisioning,
    bindings: DashMap<TenantId, TenantBindings>,
}

impl BindingRegistry {
    pub fn new(factory: Arc<dyn BindingFactory>, provisioning: Provisioning) -> Self {
        Self {
            factory,
            provisioning,
            bindings: DashMap::new(),
        }
    }

    /// In-memory, on-demand registry
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBindingFactory), Provisioning::OnDemand)
    }

    pub fn from_config(storage: &StorageConfig, tenants: &TenantsConfig) -> Result<Self> {
        let factory = storage.build_factory()?;
        let provisioning = tenants.provisioning()?;
        Ok(Self::new(factory, provisioning))
    }

    pub fn backend_description(&self) -> String {
        self.factory.describe()
    }

    pub fn is_available(&self) -> bool {
        self.factory.is_available()
    }

    /// Number of tenants with live bindings
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve the bindings for a tenant, creating them on first use.
    ///
    /// Idempotent: every call for the same tenant returns handles to the same
    /// store instances, even when first-time resolutions race.
    pub async fn resolve(&self, tenant_id: &TenantId) -> Result<(TenantBindings, Resolution)> {
        if let Provisioning::Static(allowed) = &self.provisioning
            && !allowed.contains(tenant_id)
        {
            return Err(Error::TenantNotProvisioned(tenant_id.to_string()));
        }

        if let Some(existing) = self.bindings.get(tenant_id) {
            return Ok((existing.clone(), Resolution::Cached));
        }

        let created = self.factory.create(tenant_id).await.map_err(|e| {
            Error::StorageBindingUnavailable(format!(
                "failed to bind tenant storage on {}: {}",
                self.factory.describe(),
                e
            ))
        })?;

        // A concurrent resolution may have won; its bindings are kept and ours dropped
        match self.bindings.entry(tenant_id.clone()) {
            Entry::Occupied(entry) => Ok((entry.get().clone(), Resolution::Cached)),
            Entry::Vacant(entry) => {
                entry.insert(created.clone());
                Ok((created, Resolution::Created))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tenant(id: &str) -> TenantId {
        TenantId::from_string(id).unwrap()
    }

    struct BrokenFactory;

    #[async_trait]
    impl BindingFactory for BrokenFactory {
        async fn create(&self, _tenant_id: &TenantId) -> StorageResult<TenantBindings> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into())
        }

        fn describe(&self) -> String {
            "broken".to_string()
        }
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let registry = BindingRegistry::in_memory();

        let (first, how_first) = registry.resolve(&tenant("alice")).await.unwrap();
        let (second, how_second) = registry.resolve(&tenant("alice")).await.unwrap();

        assert_eq!(how_first, Resolution::Created);
        assert_eq!(how_second, Resolution::Cached);
        assert!(first.shares_storage_with(&second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_tenants_get_disjoint_bindings() {
        let registry = BindingRegistry::in_memory();

        let (alice, _) = registry.resolve(&tenant("alice")).await.unwrap();
        let (bob, _) = registry.resolve(&tenant("bob")).await.unwrap();

        assert!(!alice.shares_storage_with(&bob));
        alice.kv.put("secret", b"a".to_vec()).await.unwrap();
        assert_eq!(bob.kv.get("secret").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_first_resolution_converges() {
        let registry = Arc::new(BindingRegistry::in_memory());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.resolve(&tenant("carol")).await.unwrap().0 })
            })
            .collect();
        let resolved: Vec<TenantBindings> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        for bindings in &resolved[1..] {
            assert!(bindings.shares_storage_with(&resolved[0]));
        }
    }

    #[tokio::test]
    async fn test_static_provisioning_rejects_unknown() {
        let allowed = HashSet::from([tenant("alice")]);
        let registry =
            BindingRegistry::new(Arc::new(MemoryBindingFactory), Provisioning::Static(allowed));

        assert!(registry.resolve(&tenant("alice")).await.is_ok());
        let err = registry.resolve(&tenant("mallory")).await.unwrap_err();
        assert!(matches!(err, Error::TenantNotProvisioned(_)));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_factory_failure_is_binding_unavailable() {
        let registry = BindingRegistry::new(Arc::new(BrokenFactory), Provisioning::OnDemand);

        let err = registry.resolve(&tenant("alice")).await.unwrap_err();
        match err {
            Error::StorageBindingUnavailable(detail) => {
                assert!(detail.contains("broken"));
                assert!(detail.contains("read-only"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_local_factory_separates_tenant_directories() {
        let temp_dir = TempDir::new().unwrap();
        let factory = LocalBindingFactory::new(temp_dir.path());

        let alice = factory.create(&tenant("alice")).await.unwrap();
        let traversal = factory.create(&tenant("../alice")).await.unwrap();

        alice.kv.put("k", b"1".to_vec()).await.unwrap();
        assert_eq!(traversal.kv.get("k").await.unwrap(), None);
        assert_ne!(
            factory.tenant_dir(&tenant("alice")),
            factory.tenant_dir(&tenant("../alice"))
        );
        assert!(factory.tenant_dir(&tenant("../alice")).starts_with(temp_dir.path()));
    }

    #[test]
    fn test_local_availability_follows_root() {
        let temp_dir = TempDir::new().unwrap();

        assert!(LocalBindingFactory::new(temp_dir.path()).is_available());
        assert!(!LocalBindingFactory::new(temp_dir.path().join("missing")).is_available());
        assert!(BindingRegistry::in_memory().is_available());
    }
}
