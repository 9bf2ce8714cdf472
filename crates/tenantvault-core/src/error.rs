//! Error types for TenantVault Core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // Multi-tenancy errors
    #[error("Invalid tenant: {0}")]
    InvalidTenant(String),

    #[error("Tenant not provisioned: {0}")]
    TenantNotProvisioned(String),

    #[error("Storage binding unavailable: {0}")]
    StorageBindingUnavailable(String),

    // Backend errors
    #[error("Upstream storage failure: {0}")]
    Storage(String),

    #[error("Concurrent modification of '{key}' after {attempts} attempts")]
    Conflict { key: String, attempts: usize },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error originated in a storage backend rather than in the caller's input
    pub fn is_upstream(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Conflict { .. } | Error::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
