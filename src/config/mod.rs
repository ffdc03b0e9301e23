//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse, lenient.rs drops malformed values, deserialize)
//!     → env.rs (KEY=value overrides, <DEPENDENCY>_URL)
//!     → validation.rs (out-of-range values → defaults)
//!     → HealthConfig (typed, assembled once)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → registry reconciles dependency declarations
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow an empty or absent file
//! - A bad option value never aborts start-up
//! - Breaker policy changes apply to newly registered dependencies only

pub mod duration;
pub mod env;
pub mod lenient;
pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load, ConfigError, LoadedConfig};
pub use schema::{DependencySettings, HealthConfig, LogFormat, ObservabilityConfig, ServiceConfig};
pub use validation::ConfigWarning;
