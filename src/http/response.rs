//! Verdict → HTTP status mapping.
//!
//! - Health: healthy → 200, otherwise 503
//! - Readiness: fully_ready → 200, partially_ready → 202, not_ready → 503
//! - Liveness: always 200

use axum::http::StatusCode;

use crate::health::{HealthStatus, ReadinessLevel};

pub fn health_status_code(status: &HealthStatus) -> StatusCode {
    if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

pub fn readiness_status_code(level: ReadinessLevel) -> StatusCode {
    match level {
        ReadinessLevel::FullyReady => StatusCode::OK,
        ReadinessLevel::PartiallyReady => StatusCode::ACCEPTED,
        ReadinessLevel::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    }
}
