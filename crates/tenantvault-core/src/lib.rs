//! TenantVault Core Types and Traits
//!
//! This crate provides the fundamental types and traits used throughout TenantVault:
//! - Tenant identifiers and per-tenant storage bindings
//! - Key-value and blob store trait abstractions
//! - Core error types

pub mod blob_store;
pub mod error;
pub mod kv_store;
pub mod tenant;

pub use blob_store::{BlobMeta, BlobObject, BlobStore};
pub use error::{Error, Result};
pub use kv_store::{KeyValueStore, Versioned};
pub use tenant::{TenantBindings, TenantId};
