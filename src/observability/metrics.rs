//! Metrics collection and exposition.
//!
//! # Metrics
//! - `health_checks_total` (counter): check outcomes by dependency, status
//! - `health_check_duration_seconds` (histogram): check latency by dependency
//! - `health_circuit_breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//! - `health_probe_requests_total` (counter): probe responses by endpoint, status
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and off by default

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_check(dependency: &str, healthy: bool, duration: Duration) {
    let status = if healthy { "healthy" } else { "unhealthy" };
    counter!(
        "health_checks_total",
        "dependency" => dependency.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "health_check_duration_seconds",
        "dependency" => dependency.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_breaker_state(dependency: &str, state: CircuitState) {
    let value = match state {
        CircuitState::Closed => 0.0,
        CircuitState::HalfOpen => 1.0,
        CircuitState::Open => 2.0,
    };
    gauge!(
        "health_circuit_breaker_state",
        "dependency" => dependency.to_string()
    )
    .set(value);
}

pub fn record_probe(endpoint: &'static str, status: u16) {
    counter!(
        "health_probe_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}
