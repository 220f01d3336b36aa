//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status, endpoint class
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `storage_fallbacks_total` (counter): sentinel returns by store and operation
//! - `rate_limited_total` (counter): rejected requests by route class
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, class: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "class" => class
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "status" => status,
        "class" => class
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_storage_fallback(store: &'static str, op: &'static str) {
    counter!("storage_fallbacks_total", "store" => store, "op" => op).increment(1);
}

pub fn record_rate_limited(class: &'static str) {
    counter!("rate_limited_total", "class" => class).increment(1);
}
