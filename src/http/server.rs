//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the probe handlers
//! - Wire up middleware (request ID, tracing, timeout backstop)
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HealthConfig;
use crate::health::HealthAggregator;
use crate::http::handlers;
use crate::lifecycle::shutdown;

/// Grace on top of the probe deadline before the router gives up on a request.
const TIMEOUT_GRACE: Duration = Duration::from_secs(1);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<HealthAggregator>,
    /// Deadline handed to every evaluation pass.
    pub probe_deadline: Duration,
}

/// HTTP server exposing the probe surface.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &HealthConfig, aggregator: Arc<HealthAggregator>) -> Self {
        let state = AppState {
            aggregator,
            probe_deadline: config.timeouts.probe_deadline,
        };
        Self {
            router: build_router(state),
        }
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Probe server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("Probe server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let backstop = backstop_layer(state.probe_deadline);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/health/ready", get(handlers::ready))
        .route("/health/live", get(handlers::live))
        .route("/health/breakers", get(handlers::breakers))
        .with_state(state)
        .layer(backstop)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Requests outliving the probe deadline plus grace answer 503, like an
/// unhealthy verdict.
fn backstop_layer(probe_deadline: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(
        StatusCode::SERVICE_UNAVAILABLE,
        probe_deadline.saturating_add(TIMEOUT_GRACE),
    )
}
