//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Peer dependency check:
//!     → circuit_breaker.rs can_execute() (skip the network when open)
//!     → check strategy (bounded by its own timeout)
//!     → circuit_breaker.rs record_success() / record_failure()
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound check has a deadline
//! - Circuit breaker bounds the cost of a dead peer to O(1) per pass

pub mod circuit_breaker;
