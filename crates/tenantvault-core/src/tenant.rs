//! Tenant identifiers and the storage bindings owned by a tenant

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::{BlobStore, Error, KeyValueStore, Result};

/// Opaque identifier selecting a tenant's execution context.
///
/// The value is never interpreted, only compared. The one constraint is
/// that it must not be blank, since a blank identifier cannot select a
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant ID from a raw header or config value
    pub fn from_string(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::InvalidTenant(
                "Tenant identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

/// The pair of storage handles bound to exactly one tenant.
///
/// This is the unit of dependency injection: operation logic is shared, and
/// each invocation receives the bindings of the tenant it runs for. Two
/// different tenants never share a `TenantBindings` value.
#[derive(Clone)]
pub struct TenantBindings {
    /// Tenant these bindings belong to
    pub tenant_id: TenantId,

    /// Key-value namespace of the tenant
    pub kv: Arc<dyn KeyValueStore>,

    /// Blob namespace of the tenant
    pub blobs: Arc<dyn BlobStore>,
}

impl TenantBindings {
    pub fn new(
        tenant_id: TenantId,
        kv: Arc<dyn KeyValueStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            tenant_id,
            kv,
            blobs,
        }
    }

    /// Whether both handles point at the same store instances as `other`
    pub fn shares_storage_with(&self, other: &TenantBindings) -> bool {
        Arc::ptr_eq(&self.kv, &other.kv) && Arc::ptr_eq(&self.blobs, &other.blobs)
    }
}

impl fmt::Debug for TenantBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantBindings")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}
