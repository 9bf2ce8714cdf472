//! Storage backend errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Backend failures surface to the façade as upstream storage failures
impl From<StorageError> for tenantvault_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Config(msg) => tenantvault_core::Error::Config(msg),
            other => tenantvault_core::Error::Storage(other.to_string()),
        }
    }
}
