//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status
//! - `proxy_request_duration_seconds` (histogram): end-to-end latency
//! - `proxy_upstream_duration_seconds` (histogram): time to upstream headers, per route
//! - `proxy_upstream_errors_total` (counter): upstream failures by route, kind
//! - `proxy_route_misses_total` (counter): requests for unconfigured hosts
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Recording never alters request or response handling

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_latency(route: &str, start: tokio::time::Instant) {
    histogram!("proxy_upstream_duration_seconds", "route" => route.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error(route: &str, kind: &'static str) {
    counter!(
        "proxy_upstream_errors_total",
        "route" => route.to_string(),
        "kind" => kind
    )
    .increment(1);
}

pub fn record_route_miss() {
    counter!("proxy_route_misses_total").increment(1);
}
