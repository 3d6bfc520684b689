//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): forwarded requests by route, method, status
//! - `gateway_request_duration_seconds` (histogram): backend call latency
//! - `gateway_upstream_failures_total` (counter): failures by kind
//! - `gateway_admission_rejected_total` (counter)
//! - `gateway_session_conflicts_total` (counter)
//! - `gateway_sessions_swept_total` (counter)
//! - `gateway_active_sessions` (gauge): locks left after the last sweep
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::{Method, StatusCode};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::FailureKind;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &str, method: &Method, status: Option<StatusCode>, duration: Duration) {
    let status = status
        .map(|s| s.as_u16().to_string())
        .unwrap_or_else(|| "none".to_string());
    ::metrics::counter!(
        "gateway_requests_total",
        "route" => route.to_string(),
        "method" => method.as_str().to_string(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", "route" => route.to_string())
        .record(duration.as_secs_f64());
}

pub fn record_upstream_failure(kind: FailureKind) {
    ::metrics::counter!("gateway_upstream_failures_total", "kind" => kind.as_str()).increment(1);
}

pub fn record_admission_rejected() {
    ::metrics::counter!("gateway_admission_rejected_total").increment(1);
}

pub fn record_session_conflict() {
    ::metrics::counter!("gateway_session_conflicts_total").increment(1);
}

pub fn record_sessions_swept(count: usize) {
    ::metrics::counter!("gateway_sessions_swept_total").increment(count as u64);
}

pub fn record_active_sessions(count: usize) {
    ::metrics::gauge!("gateway_active_sessions").set(count as f64);
}
