//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_decisions_total` (counter): decisions by outcome and status
//! - `gatekeeper_access_log_dropped_total` (counter): undelivered log events by reason
//! - `gatekeeper_rate_limit_entries` (gauge): client IPs currently tracked
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(outcome: &'static str, status: u16) {
    metrics::counter!(
        "gatekeeper_decisions_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_access_log_dropped(reason: &'static str) {
    metrics::counter!("gatekeeper_access_log_dropped_total", "reason" => reason).increment(1);
}

pub fn record_rate_limit_entries(count: usize) {
    metrics::gauge!("gatekeeper_rate_limit_entries").set(count as f64);
}
