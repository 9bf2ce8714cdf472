//! Shared ingress middleware

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::Instrument;

use tenantvault_context::TenantContext;
use tenantvault_core::{Error as CoreError, TenantId};

use crate::dispatcher::{DispatcherState, operation_for};
use crate::types::{IngressError, RequestMetadata};

/// Header carrying the tenant identifier
pub const TENANT_HEADER: &str = "x-user-id";

/// Extension key for request metadata
#[derive(Clone)]
pub struct RequestMetadataExt(pub RequestMetadata);

/// Opens the per-request span, stamps `x-request-id` on the response and
/// records request metrics
pub async fn request_context_middleware(
    State(state): State<DispatcherState>,
    mut req: Request,
    next: Next,
) -> Response {
    let metadata = RequestMetadata::from_headers(req.headers());
    let request_id = metadata.request_id.clone();
    let started_at = metadata.started_at;
    let operation = operation_for(req.method(), req.uri().path());

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        tenant = tracing::field::Empty,
        method = %req.method(),
        path = %req.uri().path(),
    );

    req.extensions_mut().insert(RequestMetadataExt(metadata));

    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status();
    state
        .metrics
        .record_request(operation, status.as_u16(), started_at.elapsed().as_secs_f64());
    span.in_scope(|| {
        if status.is_server_error() {
            tracing::warn!(operation, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(operation, status = status.as_u16(), "Request completed");
        }
    });

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Resolves `X-User-ID` to the tenant's context before any routing happens.
///
/// The resolved [`TenantContext`] is placed in the request extensions for
/// the handlers.
pub async fn tenant_resolution_middleware(
    State(state): State<DispatcherState>,
    mut req: Request,
    next: Next,
) -> Response {
    let tenant_id = match tenant_from_request(&req) {
        Ok(tenant_id) => tenant_id,
        Err(err) => {
            state.metrics.record_resolution("missing_header");
            tracing::warn!(error = %err, "Rejecting request without tenant");
            return err.into_response();
        }
    };
    tracing::Span::current().record("tenant", tracing::field::display(&tenant_id));

    match state.registry.resolve(&tenant_id).await {
        Ok((bindings, resolution)) => {
            state.metrics.record_resolution(resolution.as_str());
            state.metrics.set_tenants_bound(state.registry.len());
            tracing::debug!(outcome = resolution.as_str(), "Tenant resolved");

            if let Some(RequestMetadataExt(metadata)) =
                req.extensions_mut().remove::<RequestMetadataExt>()
            {
                req.extensions_mut()
                    .insert(RequestMetadataExt(metadata.with_tenant(tenant_id)));
            }
            req.extensions_mut().insert(TenantContext::new(bindings));
            next.run(req).await
        }
        Err(CoreError::StorageBindingUnavailable(detail)) => {
            state.metrics.record_resolution("unavailable");
            tracing::warn!(
                backend = %state.registry.backend_description(),
                detail = %detail,
                "Tenant storage binding unavailable"
            );
            let details = state.config.expose_diagnostics.then_some(detail);
            IngressError::StorageBindingUnavailable(details).into_response()
        }
        Err(err) => {
            if matches!(err, CoreError::TenantNotProvisioned(_)) {
                state.metrics.record_resolution("not_provisioned");
            }
            tracing::warn!(error = %err, "Tenant resolution failed");
            IngressError::from(err).into_response()
        }
    }
}

fn tenant_from_request(req: &Request) -> Result<TenantId, IngressError> {
    let raw = req
        .headers()
        .get(TENANT_HEADER)
        .ok_or_else(|| {
            IngressError::MissingTenantHeader("X-User-ID header is required".to_string())
        })?
        .to_str()
        .map_err(|_| {
            IngressError::MissingTenantHeader("X-User-ID header is not valid text".to_string())
        })?;

    TenantId::from_string(raw)
        .map_err(|_| IngressError::MissingTenantHeader("X-User-ID header is empty".to_string()))
}
