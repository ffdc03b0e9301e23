//! Probe endpoint handlers.

use axum::{extract::State, response::IntoResponse, Json};
use axum::http::StatusCode;

use crate::http::response::{health_status_code, readiness_status_code};
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.aggregator.evaluate(state.probe_deadline).await;
    let code = health_status_code(&status);

    tracing::debug!(status = ?status.status, code = code.as_u16(), "Health probe");
    metrics::record_probe("health", code.as_u16());
    (code, Json(status))
}

/// `GET /health/ready`
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.aggregator.readiness(state.probe_deadline).await;
    let code = readiness_status_code(report.status);

    tracing::debug!(readiness = report.status.as_str(), code = code.as_u16(), "Readiness probe");
    metrics::record_probe("ready", code.as_u16());
    (code, Json(report))
}

/// `GET /health/live`
pub async fn live(State(state): State<AppState>) -> impl IntoResponse {
    metrics::record_probe("live", StatusCode::OK.as_u16());
    (StatusCode::OK, Json(state.aggregator.liveness()))
}

/// `GET /health/breakers`
pub async fn breakers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.aggregator.breakers())
}
