//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by controller, action, status
//! - `dispatch_request_duration_seconds` (histogram): action latency
//! - `container_resolutions_total` (counter): resolutions by lifetime and cache hit
//! - `view_lookups_total` (counter): view lookups by cache outcome
//! - `registry_reloads_total` (counter): controller registry rebuilds

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::container::Lifetime;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a dispatched request.
pub fn record_request(controller: &str, action: &str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "controller" => controller.to_string(),
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "dispatch_request_duration_seconds",
        "controller" => controller.to_string(),
        "action" => action.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a dependency resolution.
pub fn record_resolution(lifetime: Lifetime, cache_hit: bool) {
    metrics::counter!(
        "container_resolutions_total",
        "lifetime" => lifetime.to_string(),
        "cache_hit" => cache_hit.to_string()
    )
    .increment(1);
}

/// Record a view lookup.
pub fn record_view_lookup(cache_hit: bool) {
    metrics::counter!("view_lookups_total", "cache_hit" => cache_hit.to_string()).increment(1);
}

/// Record a controller registry rebuild.
pub fn record_reload() {
    metrics::counter!("registry_reloads_total").increment(1);
}
