//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers, strategies, aggregator, probe handlers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (`dependency`, `target`, `message`) on every check log
//! - Request ID flows through the probe surface via `x-request-id`

pub mod logging;
pub mod metrics;
