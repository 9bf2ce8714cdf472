//! Shared ingress types and utilities

use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;

use tenantvault_core::{Error as CoreError, TenantId};

/// Longest incoming `x-request-id` that is propagated rather than replaced
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Reuse a caller-supplied ID when it is printable ASCII of sane length
    pub fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_REQUEST_ID_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request metadata collected during ingress
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: RequestId,
    /// Set once the tenant header has been resolved
    pub tenant_id: Option<TenantId>,
    pub started_at: Instant,
}

impl RequestMetadata {
    pub fn new() -> Self {
        Self {
            request_id: RequestId::generate(),
            tenant_id: None,
            started_at: Instant::now(),
        }
    }

    /// Metadata for an incoming request, honoring its `x-request-id`
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut metadata = Self::new();
        if let Some(id) = headers
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .and_then(RequestId::from_header)
        {
            metadata.request_id = id;
        }
        metadata
    }

    pub fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Ingress error types
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("Missing tenant header: {0}")]
    MissingTenantHeader(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Request too large: limit is {0} bytes")]
    RequestTooLarge(usize),

    #[error("Tenant not provisioned: {0}")]
    TenantNotProvisioned(String),

    /// Detail is only present when diagnostics are exposed
    #[error("Tenant storage binding unavailable")]
    StorageBindingUnavailable(Option<String>),

    #[error("Upstream storage failure: {0}")]
    UpstreamStorageFailure(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngressError {
    pub fn status(&self) -> StatusCode {
        match self {
            IngressError::MissingTenantHeader(_) | IngressError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            IngressError::RequestTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            IngressError::TenantNotProvisioned(_) => StatusCode::FORBIDDEN,
            IngressError::NotFound(_) => StatusCode::NOT_FOUND,
            IngressError::StorageBindingUnavailable(_)
            | IngressError::UpstreamStorageFailure(_)
            | IngressError::Serialization(_)
            | IngressError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error type reported in the response body
    pub fn error_type(&self) -> &'static str {
        match self {
            IngressError::MissingTenantHeader(_) => "missing_tenant_header",
            IngressError::InvalidRequest(_) => "invalid_request_error",
            IngressError::RequestTooLarge(_) => "request_too_large",
            IngressError::TenantNotProvisioned(_) => "tenant_not_provisioned",
            IngressError::StorageBindingUnavailable(_) => "storage_binding_unavailable",
            IngressError::UpstreamStorageFailure(_) => "upstream_storage_failure",
            IngressError::NotFound(_) => "not_found_error",
            IngressError::Serialization(_) => "serialization_error",
            IngressError::Internal(_) => "internal_error",
        }
    }
}

impl From<CoreError> for IngressError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidRequest(msg) => IngressError::InvalidRequest(msg),
            CoreError::InvalidTenant(msg) => IngressError::MissingTenantHeader(msg),
            CoreError::NotFound(msg) => IngressError::NotFound(msg),
            CoreError::TenantNotProvisioned(tenant) => IngressError::TenantNotProvisioned(tenant),
            CoreError::StorageBindingUnavailable(_) => IngressError::StorageBindingUnavailable(None),
            CoreError::Serialization(e) => IngressError::Serialization(e.to_string()),
            err @ (CoreError::Storage(_) | CoreError::Conflict { .. } | CoreError::Io(_)) => {
                IngressError::UpstreamStorageFailure(err.to_string())
            }
            CoreError::Config(msg) | CoreError::Internal(msg) => IngressError::Internal(msg),
        }
    }
}

impl axum::response::IntoResponse for IngressError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        let mut error = serde_json::json!({
            "message": self.to_string(),
            "type": self.error_type(),
            "code": status.as_u16(),
        });
        if let IngressError::StorageBindingUnavailable(Some(details)) = &self {
            error["details"] = serde_json::Value::String(details.clone());
        }

        (status, axum::Json(serde_json::json!({ "error": error }))).into_response()
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;
