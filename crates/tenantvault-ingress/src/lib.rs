//! TenantVault Ingress
//!
//! The HTTP dispatcher in front of the per-tenant storage façade:
//! - Tenant resolution from the `X-User-ID` header
//! - Routing of path + method to exactly one tenant operation
//! - Translation of every failure into a JSON error response
//! - Health, readiness and metrics endpoints that need no tenant

pub mod dispatcher;
pub mod middleware;
pub mod readiness;
pub mod types;

pub use dispatcher::{DispatcherConfig, DispatcherState, router};
pub use middleware::TENANT_HEADER;
pub use readiness::StorageReadiness;
pub use types::{IngressError, IngressResult, RequestId, RequestMetadata};
