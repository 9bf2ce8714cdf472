//! Tenant dispatcher
//!
//! Every request passes through tenant resolution before routing, so a
//! missing `X-User-ID` is rejected even for paths that do not exist. Once a
//! tenant is resolved, path + method select exactly one operation on that
//! tenant's [`TenantContext`]; anything else is a 404.

use axum::{
    Extension, Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
    },
    http::{Method, StatusCode, Uri, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use tenantvault_context::{
    ActivityEntry, DataEntry, FileRecord, ReconcileReport, StatsSnapshot, TenantContext,
};
use tenantvault_observability::{HealthState, Metrics, health_router};
use tenantvault_storage::BindingRegistry;

use crate::middleware::{request_context_middleware, tenant_resolution_middleware};
use crate::readiness::StorageReadiness;
use crate::types::{IngressError, IngressResult};

/// Dispatcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Largest accepted request body, multipart uploads included
    pub max_upload_bytes: usize,
    /// Include backend detail in binding-failure responses
    pub expose_diagnostics: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 25 * 1024 * 1024,
            expose_diagnostics: false,
        }
    }
}

/// State shared by the middleware and handlers
#[derive(Clone)]
pub struct DispatcherState {
    pub registry: Arc<BindingRegistry>,
    pub metrics: Arc<Metrics>,
    pub config: DispatcherConfig,
}

impl DispatcherState {
    pub fn new(
        registry: Arc<BindingRegistry>,
        metrics: Arc<Metrics>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            metrics,
            config,
        }
    }
}

/// Build the full application: tenant routes plus the tenant-free ops endpoints
pub fn router(state: DispatcherState) -> Router {
    let tenant_routes = Router::new()
        .route("/", get(tenant_health))
        .route("/files", post(upload_file).get(get_file).delete(delete_file))
        .route("/files/list", get(list_files))
        .route("/files/reconcile", post(reconcile_files))
        .route("/data", post(set_data).get(get_data).delete(delete_data))
        .route("/data/list", get(list_data))
        .route("/activity", get(recent_activity))
        .route("/stats", get(get_stats))
        .fallback(no_route)
        .method_not_allowed_fallback(no_route)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tenant_resolution_middleware,
        ))
        .with_state(state.clone());

    let readiness = Arc::new(StorageReadiness::new(state.registry.clone()));
    let health = health_router(HealthState::with_readiness_checker(
        state.metrics.clone(),
        readiness,
    ));

    health
        .fallback_service(tenant_routes)
        .layer(middleware::from_fn_with_state(
            state,
            request_context_middleware,
        ))
}

/// Metric label for a method + path pair
pub fn operation_for(method: &Method, path: &str) -> &'static str {
    match (method.as_str(), path) {
        ("GET", "/") => "health_check",
        ("POST", "/files") => "upload_file",
        ("GET", "/files") => "get_file",
        ("DELETE", "/files") => "delete_file",
        ("GET", "/files/list") => "list_files",
        ("POST", "/files/reconcile") => "reconcile_files",
        ("POST", "/data") => "set_data",
        ("GET", "/data") => "get_data",
        ("DELETE", "/data") => "delete_data",
        ("GET", "/data/list") => "list_data",
        ("GET", "/activity") => "recent_activity",
        ("GET", "/stats") => "get_stats",
        ("GET", "/healthz") => "healthz",
        ("GET", "/readyz") => "readyz",
        ("GET", "/metrics") => "metrics",
        _ => "unmatched",
    }
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

impl KeyQuery {
    /// The `key` parameter of a query that may have failed to parse
    fn extract(query: Result<Query<KeyQuery>, QueryRejection>) -> IngressResult<String> {
        let Query(query) = query.map_err(|rejection| {
            IngressError::InvalidRequest(format!("invalid query string: {}", rejection.body_text()))
        })?;
        query.required()
    }

    fn required(self) -> IngressResult<String> {
        match self.key {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(IngressError::InvalidRequest(
                "query parameter 'key' is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SetDataRequest {
    key: String,
    value: Value,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    success: bool,
    key: String,
    size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity_warning: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataResponse {
    key: String,
    value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    activity_warning: Option<String>,
}

#[derive(Debug, Serialize)]
struct FilesResponse {
    files: Vec<FileRecord>,
}

#[derive(Debug, Serialize)]
struct EntriesResponse<T> {
    entries: Vec<T>,
}

async fn tenant_health(Extension(ctx): Extension<TenantContext>) -> String {
    format!("TenantVault is serving tenant {}\n", ctx.tenant_id())
}

async fn upload_file(
    State(state): State<DispatcherState>,
    Extension(ctx): Extension<TenantContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> IngressResult<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        IngressError::InvalidRequest(format!("expected a multipart body: {}", rejection.body_text()))
    })?;
    let limit = state.config.max_upload_bytes;

    let mut key: Option<String> = None;
    let mut body: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("key") => key = Some(field.text().await.map_err(|e| multipart_error(e, limit))?),
            Some("file") => {
                body = Some(field.bytes().await.map_err(|e| multipart_error(e, limit))?)
            }
            _ => {}
        }
    }

    let key = key.filter(|k| !k.is_empty()).ok_or_else(|| {
        IngressError::InvalidRequest("multipart field 'key' is required".to_string())
    })?;
    let body = body.ok_or_else(|| {
        IngressError::InvalidRequest("multipart field 'file' is required".to_string())
    })?;

    let receipt = ctx.upload_file(&key, body).await?;
    Ok(Json(UploadResponse {
        success: true,
        key: receipt.key,
        size: receipt.size,
    }))
}

fn multipart_error(err: MultipartError, limit: usize) -> IngressError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        IngressError::RequestTooLarge(limit)
    } else {
        IngressError::InvalidRequest(format!("malformed multipart body: {}", err.body_text()))
    }
}

async fn get_file(
    Extension(ctx): Extension<TenantContext>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> IngressResult<Response> {
    let key = KeyQuery::extract(query)?;
    match ctx.get_file(&key).await? {
        Some(object) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            object.body,
        )
            .into_response()),
        None => Err(IngressError::NotFound(format!("file '{}'", key))),
    }
}

async fn delete_file(
    Extension(ctx): Extension<TenantContext>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> IngressResult<Json<SuccessResponse>> {
    let key = KeyQuery::extract(query)?;
    ctx.delete_file(&key).await?;
    Ok(Json(SuccessResponse {
        success: true,
        key: None,
        activity_warning: None,
    }))
}

async fn list_files(Extension(ctx): Extension<TenantContext>) -> IngressResult<Json<FilesResponse>> {
    Ok(Json(FilesResponse {
        files: ctx.list_files().await?,
    }))
}

async fn reconcile_files(
    Extension(ctx): Extension<TenantContext>,
) -> IngressResult<Json<ReconcileReport>> {
    Ok(Json(ctx.reconcile_files().await?))
}

async fn set_data(
    Extension(ctx): Extension<TenantContext>,
    payload: Result<Json<SetDataRequest>, JsonRejection>,
) -> IngressResult<Json<SuccessResponse>> {
    let Json(request) = payload.map_err(|rejection| {
        IngressError::InvalidRequest(format!("expected {{key, value}}: {}", rejection.body_text()))
    })?;

    let outcome = ctx.set_data(&request.key, &request.value).await?;
    Ok(Json(SuccessResponse {
        success: true,
        key: Some(request.key),
        activity_warning: outcome.activity_warning,
    }))
}

async fn get_data(
    Extension(ctx): Extension<TenantContext>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> IngressResult<Json<DataResponse>> {
    let key = KeyQuery::extract(query)?;
    let outcome = ctx.get_data(&key).await?;
    Ok(Json(DataResponse {
        key,
        value: outcome.value.unwrap_or(Value::Null),
        activity_warning: outcome.activity_warning,
    }))
}

async fn delete_data(
    Extension(ctx): Extension<TenantContext>,
    query: Result<Query<KeyQuery>, QueryRejection>,
) -> IngressResult<Json<SuccessResponse>> {
    let key = KeyQuery::extract(query)?;
    let outcome = ctx.delete_data(&key).await?;
    Ok(Json(SuccessResponse {
        success: true,
        key: None,
        activity_warning: outcome.activity_warning,
    }))
}

async fn list_data(
    Extension(ctx): Extension<TenantContext>,
) -> IngressResult<Json<EntriesResponse<DataEntry>>> {
    Ok(Json(EntriesResponse {
        entries: ctx.list_data().await?,
    }))
}

async fn recent_activity(
    Extension(ctx): Extension<TenantContext>,
) -> IngressResult<Json<EntriesResponse<ActivityEntry>>> {
    Ok(Json(EntriesResponse {
        entries: ctx.recent_activity().await?,
    }))
}

async fn get_stats(Extension(ctx): Extension<TenantContext>) -> IngressResult<Json<StatsSnapshot>> {
    Ok(Json(ctx.get_stats().await?))
}

async fn no_route(method: Method, uri: Uri) -> IngressError {
    IngressError::NotFound(format!("no route for {} {}", method, uri.path()))
}
