//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting probes → Drain in-flight passes → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans shutdown out to the server and the watcher
//! - In-flight evaluation passes are bounded by the probe deadline, so
//!   draining always terminates

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
