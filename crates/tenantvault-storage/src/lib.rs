//! TenantVault Storage Backends
//!
//! This crate provides the storage implementations bound to tenants:
//! - In-memory key-value and blob stores
//! - File-backed key-value store (JSON snapshot, atomic writes)
//! - Local filesystem blob store
//! - Binding registry mapping tenant IDs to their store pair

mod atomic_writer;
pub mod config;
pub mod error;
pub mod file_kv;
pub mod local_blob;
pub mod memory;
pub mod registry;

pub use config::{BackendKind, ProvisioningMode, StorageConfig, TenantsConfig};
pub use error::{StorageError, StorageResult};
pub use file_kv::FileKeyValueStore;
pub use local_blob::LocalBlobStore;
pub use memory::{MemoryBlobStore, MemoryKeyValueStore};
pub use registry::{
    BindingFactory, BindingRegistry, LocalBindingFactory, MemoryBindingFactory, Provisioning,
    Resolution,
};
