//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the health
//! engine. All types derive Serde traits for deserialization from TOML files;
//! environment overrides are layered on top by `env.rs`.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::checks::{CheckKind, DependencyConfig};
use crate::config::duration::{human, human_option};
use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HealthConfig {
    /// Identity reported in health responses.
    pub service: ServiceConfig,

    /// Probe surface bind address.
    pub listener: ListenerConfig,

    /// Check timeouts and the probe deadline.
    pub timeouts: TimeoutConfig,

    /// Default breaker policy for peer dependencies.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Primary datastore.
    pub datastore: DatastoreConfig,

    /// Evaluation pass settings.
    pub aggregator: AggregatorConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Peer dependencies, in check order.
    pub dependencies: Vec<DependencySettings>,
}

impl HealthConfig {
    /// Default timeout for a check kind when a dependency sets none.
    pub fn timeout_for(&self, kind: CheckKind) -> Duration {
        match kind {
            CheckKind::Http => self.timeouts.http_check,
            CheckKind::Tcp => self.timeouts.tcp_check,
            CheckKind::Datastore => self.timeouts.datastore,
        }
    }

    /// Resolve declared dependencies into registry configs.
    pub fn dependency_configs(&self) -> Vec<DependencyConfig> {
        self.dependencies
            .iter()
            .map(|dep| DependencyConfig {
                name: dep.name.clone(),
                target: dep.target.clone(),
                timeout: dep.timeout.unwrap_or_else(|| self.timeout_for(dep.check)),
                critical: dep.critical,
                kind: dep.check,
                expected_status: dep.expected_status.unwrap_or(200),
                headers: dep.headers.clone(),
                circuit_breaker: dep.circuit_breaker.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub version: String,
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "service".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connect timeout of the shared outbound HTTP client.
    #[serde(with = "human")]
    pub default: Duration,

    #[serde(with = "human")]
    pub datastore: Duration,

    #[serde(with = "human")]
    pub http_check: Duration,

    #[serde(with = "human")]
    pub tcp_check: Duration,

    /// Upper bound on one whole evaluation pass.
    #[serde(with = "human")]
    pub probe_deadline: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default: Duration::from_secs(10),
            datastore: Duration::from_secs(5),
            http_check: Duration::from_secs(5),
            tcp_check: Duration::from_secs(3),
            probe_deadline: Duration::from_secs(15),
        }
    }
}

/// Primary datastore. Unset `url` means no datastore is monitored.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub url: Option<String>,
    pub name: String,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            name: "primary".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Run peer checks concurrently instead of one after another.
    pub parallel_checks: bool,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Expose a Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A peer dependency as declared in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DependencySettings {
    /// Unique dependency name.
    pub name: String,

    /// URL (HTTP) or host:port (TCP).
    #[serde(alias = "url")]
    pub target: String,

    #[serde(default = "default_check")]
    pub check: CheckKind,

    #[serde(default)]
    pub critical: bool,

    /// Falls back to the timeout for `check` when unset.
    #[serde(default, with = "human_option", skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<u16>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl DependencySettings {
    pub fn new(name: impl Into<String>, check: CheckKind, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            check,
            critical: false,
            timeout: None,
            expected_status: None,
            headers: BTreeMap::new(),
            circuit_breaker: None,
        }
    }
}

fn default_check() -> CheckKind {
    CheckKind::Http
}
