//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for TenantVault:
//! - Request counts by operation and response status
//! - Request latency by operation
//! - Tenant resolution outcomes
//! - Number of tenants with live storage bindings

use prometheus::{CounterVec, HistogramOpts, HistogramVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for TenantVault
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Total dispatched requests
    pub requests_total: CounterVec,
    /// End-to-end request duration
    pub request_duration_seconds: HistogramVec,

    /// Tenant resolutions (cached, created, missing_header, not_provisioned, unavailable)
    pub tenant_resolutions_total: CounterVec,
    /// Tenants with live storage bindings
    pub tenants_bound: IntGauge,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("tenantvault_requests_total", "Total number of requests"),
            &["operation", "status"],
        )?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tenantvault_request_duration_seconds",
                "Request duration in seconds",
            )
            .buckets(vec![
                0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["operation"],
        )?;

        let tenant_resolutions_total = CounterVec::new(
            Opts::new(
                "tenantvault_tenant_resolutions_total",
                "Tenant resolutions by outcome",
            ),
            &["outcome"],
        )?;

        let tenants_bound = IntGauge::with_opts(Opts::new(
            "tenantvault_tenants_bound",
            "Tenants with live storage bindings",
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(tenant_resolutions_total.clone()))?;
        registry.register(Box::new(tenants_bound.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
            tenant_resolutions_total,
            tenants_bound,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a completed request
    pub fn record_request(&self, operation: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.requests_total
            .with_label_values(&[operation, status.as_str()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[operation])
            .observe(duration_secs);
    }

    /// Record how a tenant header was resolved
    pub fn record_resolution(&self, outcome: &str) {
        self.tenant_resolutions_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn set_tenants_bound(&self, count: usize) {
        self.tenants_bound.set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter_value(metrics: &Metrics, name: &str) -> f64 {
        let gathered = metrics.registry().gather();
        let family = gathered
            .iter()
            .find(|m| m.name() == name)
            .unwrap_or_else(|| panic!("{name} metric not found"));
        family.metric[0].counter.as_ref().unwrap().value.unwrap()
    }

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.set_tenants_bound(0);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("upload_file", 200, 0.02);
        metrics.record_request("upload_file", 200, 0.03);

        assert_eq!(counter_value(&metrics, "tenantvault_requests_total"), 2.0);

        let duration = metrics
            .request_duration_seconds
            .with_label_values(&["upload_file"]);
        assert_eq!(duration.get_sample_count(), 2);
    }

    #[test]
    fn test_status_is_a_label() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("get_file", 200, 0.01);
        metrics.record_request("get_file", 404, 0.01);

        let ok = metrics
            .requests_total
            .with_label_values(&["get_file", "200"])
            .get();
        let missing = metrics
            .requests_total
            .with_label_values(&["get_file", "404"])
            .get();
        assert_eq!((ok, missing), (1.0, 1.0));
    }

    #[test]
    fn test_record_resolution() {
        let metrics = Metrics::new().unwrap();
        metrics.record_resolution("created");

        assert_eq!(
            counter_value(&metrics, "tenantvault_tenant_resolutions_total"),
            1.0
        );
    }

    #[test]
    fn test_tenants_bound_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.set_tenants_bound(3);
        assert_eq!(metrics.tenants_bound.get(), 3);
    }
}
