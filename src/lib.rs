//! Dependency health-monitoring engine.
//!
//! Probes a service's declared dependencies (a primary datastore plus peer
//! services over HTTP or TCP), guards each peer behind its own circuit
//! breaker, and folds the results into health, readiness and liveness
//! verdicts served over HTTP.

pub mod checks;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use checks::{CheckKind, CheckResult, CheckStatus, Datastore, DependencyConfig, Probe};
pub use config::HealthConfig;
pub use health::{DependencyRegistry, HealthAggregator, HealthStatus, ReadinessLevel, ReadinessReport};
pub use http::HttpServer;
pub use lifecycle::shutdown::Shutdown;
pub use resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
