//! Readiness of the storage backend behind the dispatcher

use std::sync::Arc;

use tenantvault_observability::{ComponentStatus, ReadinessChecker};
use tenantvault_storage::BindingRegistry;

pub struct StorageReadiness {
    registry: Arc<BindingRegistry>,
}

impl StorageReadiness {
    pub fn new(registry: Arc<BindingRegistry>) -> Self {
        Self { registry }
    }
}

impl ReadinessChecker for StorageReadiness {
    fn is_ready(&self) -> bool {
        self.registry.is_available()
    }

    fn component_statuses(&self) -> Vec<ComponentStatus> {
        let status = if self.registry.is_available() {
            "available"
        } else {
            "unavailable"
        };
        vec![ComponentStatus {
            name: "storage".to_string(),
            status: status.to_string(),
            detail: Some(format!(
                "{} ({} tenants bound)",
                self.registry.backend_description(),
                self.registry.len()
            )),
        }]
    }
}
