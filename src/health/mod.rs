//! Health evaluation subsystem.
//!
//! # Data Flow
//! ```text
//! registry.rs (name → config + breaker)
//!     → aggregator.rs (one pass per probe request)
//!         datastore: probed directly, always critical
//!         peers: breaker.can_execute()?
//!             no  → synthesized "circuit breaker open" result
//!             yes → check strategy → record_success / record_failure
//!     → status.rs (HealthStatus / ReadinessReport / LivenessReport)
//! ```
//!
//! # Design Decisions
//! - Overall status follows critical dependencies only
//! - Readiness distinguishes critical-only health from total health
//! - Liveness is decoupled from downstream health

pub mod aggregator;
pub mod registry;
pub mod status;

pub use aggregator::HealthAggregator;
pub use registry::{DependencyRegistry, RegisteredDependency, RegistryError};
pub use status::{HealthStatus, LivenessReport, ReadinessLevel, ReadinessReport, DATASTORE_KEY};
