//! Application assembly: storage registry, metrics and the dispatcher router

use anyhow::Context;
use axum::Router;
use std::sync::Arc;

use tenantvault_ingress::{DispatcherState, router};
use tenantvault_observability::Metrics;
use tenantvault_storage::{BackendKind, BindingRegistry};

use crate::config::ServerConfig;

/// Build the HTTP application described by `config`.
///
/// For the `local` backend the storage root is created up front so that
/// `/readyz` reports ready on a fresh install.
pub fn build_app(config: &ServerConfig) -> anyhow::Result<Router> {
    if config.storage.backend == BackendKind::Local
        && let Some(root) = &config.storage.root
    {
        std::fs::create_dir_all(root)
            .with_context(|| format!("failed to create storage root {}", root.display()))?;
    }

    let registry = Arc::new(
        BindingRegistry::from_config(&config.storage, &config.tenants)
            .context("invalid storage configuration")?,
    );
    let metrics = Arc::new(Metrics::new().context("failed to register metrics")?);

    tracing::info!(
        backend = %registry.backend_description(),
        provisioning = ?config.tenants.provisioning,
        max_upload_bytes = config.dispatcher.max_upload_bytes,
        "Storage registry ready"
    );

    Ok(router(DispatcherState::new(
        registry,
        metrics,
        config.dispatcher.clone(),
    )))
}
