//! Metrics collection and exposition.
//!
//! # Metrics
//! - `declarest_requests_total` (counter): requests by method, route, status
//! - `declarest_request_duration_seconds` (histogram): latency distribution
//! - `declarest_reloads_total` (counter): hot reloads by result
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Route label is the declared path, never the raw request path, to keep
//!   cardinality bounded

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Route label for requests that matched no declared path.
pub const UNMATCHED: &str = "unmatched";

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("declarest_requests_total", &labels).increment(1);
    ::metrics::histogram!("declarest_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(success: bool) {
    let result = if success { "success" } else { "failure" };
    ::metrics::counter!("declarest_reloads_total", "result" => result).increment(1);
}
