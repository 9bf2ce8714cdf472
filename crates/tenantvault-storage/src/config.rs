//! Storage and tenant provisioning configuration

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tenantvault_core::TenantId;

use crate::error::{StorageError, StorageResult};
use crate::registry::{BindingFactory, LocalBindingFactory, MemoryBindingFactory, Provisioning};

/// Which backend tenant namespaces are created on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    Local,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: BackendKind,

    /// Root directory for the `local` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

impl StorageConfig {
    pub fn validate(&self) -> StorageResult<()> {
        self.build_factory().map(|_| ())
    }

    /// Build the factory that creates per-tenant bindings
    pub fn build_factory(&self) -> StorageResult<Arc<dyn BindingFactory>> {
        match self.backend {
            BackendKind::Memory => Ok(Arc::new(MemoryBindingFactory)),
            BackendKind::Local => {
                let root = self.root.as_ref().ok_or_else(|| {
                    StorageError::Config("storage.root is required for the local backend".to_string())
                })?;
                Ok(Arc::new(LocalBindingFactory::new(root)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningMode {
    /// Any tenant gets a fresh namespace on first use
    #[default]
    OnDemand,
    /// Only tenants listed in `allowed` are routed
    Static,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TenantsConfig {
    #[serde(default)]
    pub provisioning: ProvisioningMode,

    #[serde(default)]
    pub allowed: Vec<String>,
}

impl TenantsConfig {
    pub fn provisioning(&self) -> StorageResult<Provisioning> {
        match self.provisioning {
            ProvisioningMode::OnDemand => Ok(Provisioning::OnDemand),
            ProvisioningMode::Static => {
                let allowed = self
                    .allowed
                    .iter()
                    .map(|raw| {
                        TenantId::from_string(raw)
                            .map_err(|e| StorageError::Config(format!("tenants.allowed: {}", e)))
                    })
                    .collect::<StorageResult<HashSet<_>>>()?;
                if allowed.is_empty() {
                    return Err(StorageError::Config(
                        "static provisioning requires at least one entry in tenants.allowed"
                            .to_string(),
                    ));
                }
                Ok(Provisioning::Static(allowed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_backend_requires_root() {
        let config = StorageConfig {
            backend: BackendKind::Local,
            root: None,
        };
        assert!(config.validate().is_err());
        assert!(config.build_factory().is_err());
    }

    #[test]
    fn test_backend_kind_deserialization() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"backend":"local","root":"/var/lib/tenantvault"}"#).unwrap();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.root, Some(PathBuf::from("/var/lib/tenantvault")));

        let default: StorageConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(default.backend, BackendKind::Memory);
    }

    #[test]
    fn test_static_provisioning() {
        let config: TenantsConfig =
            serde_json::from_str(r#"{"provisioning":"static","allowed":["alice","bob"]}"#).unwrap();

        match config.provisioning().unwrap() {
            Provisioning::Static(allowed) => {
                assert_eq!(allowed.len(), 2);
                assert!(allowed.contains(&TenantId::from_string("alice").unwrap()));
            }
            Provisioning::OnDemand => panic!("expected static provisioning"),
        }
    }

    #[test]
    fn test_static_provisioning_rejects_empty_or_blank() {
        let empty = TenantsConfig {
            provisioning: ProvisioningMode::Static,
            allowed: vec![],
        };
        assert!(empty.provisioning().is_err());

        let blank = TenantsConfig {
            provisioning: ProvisioningMode::Static,
            allowed: vec!["  ".to_string()],
        };
        assert!(blank.provisioning().is_err());
    }
}
