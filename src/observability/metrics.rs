//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shadow_candidates_discovered_total` (counter): candidates returned by the source
//! - `shadow_discovery_errors_total` (counter): failed discovery cycles, by source
//! - `shadow_jobs_enqueued_total` (counter): clone jobs sent, by reason (new, retry)
//! - `shadow_clones_total` (counter): finished clones, by outcome
//! - `shadow_registry_entries` (gauge): identities known to the registry

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_candidates_discovered(count: usize) {
    metrics::counter!("shadow_candidates_discovered_total").increment(count as u64);
}

pub fn record_discovery_error(source: &'static str) {
    metrics::counter!("shadow_discovery_errors_total", "source" => source).increment(1);
}

pub fn record_job_enqueued(reason: &'static str) {
    metrics::counter!("shadow_jobs_enqueued_total", "reason" => reason).increment(1);
}

pub fn record_clone(outcome: &'static str) {
    metrics::counter!("shadow_clones_total", "outcome" => outcome).increment(1);
}

pub fn record_registry_size(size: usize) {
    metrics::gauge!("shadow_registry_entries").set(size as f64);
}
