//! Probe surface.
//!
//! # Data Flow
//! ```text
//! Orchestrator poll
//!     → server.rs (Axum router, request ID, tracing, timeout backstop)
//!     → handlers.rs (/health, /health/ready, /health/live, /health/breakers)
//!     → HealthAggregator (health and readiness only)
//!     → response.rs (verdict → status code)
//!     → JSON body
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{build_router, AppState, HttpServer};
