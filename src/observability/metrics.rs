//! Metrics collection and exposition.
//!
//! # Metrics
//! - `concurrent_select_limit_reached_total` (counter): acquisitions that had to queue
//! - `concurrent_select_limit_timeout_total` (counter): queued acquisitions that timed out
//! - `concurrent_select_capacity` (gauge): configured slot count
//! - `concurrent_select_current` (gauge): slots currently held
//! - `http_requests_total{path}` / `http_request_errors_total{path}` (counters): per endpoint
//! - `http_request_duration_seconds{path}` (histogram): handler latency
//! - `storage_node_healthy{addr}` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Emission goes through the `metrics` facade; with no recorder installed
//!   every call is a no-op
//! - Prometheus text is rendered on the main listener at `/metrics`

use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

pub const LIMIT_REACHED: &str = "concurrent_select_limit_reached_total";
pub const LIMIT_TIMEOUT: &str = "concurrent_select_limit_timeout_total";
pub const CAPACITY: &str = "concurrent_select_capacity";
pub const CURRENT: &str = "concurrent_select_current";
pub const REQUESTS: &str = "http_requests_total";
pub const REQUEST_ERRORS: &str = "http_request_errors_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const STORAGE_NODE_HEALTHY: &str = "storage_node_healthy";

/// Install the Prometheus recorder as the global metrics recorder.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_limit_reached() {
    metrics::counter!(LIMIT_REACHED).increment(1);
}

pub fn record_limit_timeout() {
    metrics::counter!(LIMIT_TIMEOUT).increment(1);
}

pub fn record_occupancy(capacity: usize, current: usize) {
    metrics::gauge!(CAPACITY).set(capacity as f64);
    metrics::gauge!(CURRENT).set(current as f64);
}

pub fn record_request(path: &'static str) {
    metrics::counter!(REQUESTS, "path" => path).increment(1);
}

pub fn record_request_error(path: &'static str) {
    metrics::counter!(REQUEST_ERRORS, "path" => path).increment(1);
}

pub fn record_duration(path: &'static str, start: Instant) {
    metrics::histogram!(REQUEST_DURATION, "path" => path).record(start.elapsed().as_secs_f64());
}

pub fn record_storage_health(addr: &str, healthy: bool) {
    metrics::gauge!(STORAGE_NODE_HEALTHY, "addr" => addr.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
