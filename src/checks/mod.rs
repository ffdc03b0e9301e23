//! Check strategies.
//!
//! # Data Flow
//! ```text
//! Aggregator
//!     → Probe::probe(dependency, timeout)
//!         datastore.rs (ping the datastore handle)
//!         http.rs      (GET <target>/health, compare status code)
//!         tcp.rs       (dial host:port, close immediately)
//!     → CheckResult (always data, never an error)
//! ```
//!
//! # Design Decisions
//! - Strategies never fail outward; every failure mode is an unhealthy result
//! - Each strategy enforces the timeout it is handed
//! - `details` carries the probed target for operator diagnosis

pub mod datastore;
pub mod http;
pub mod tcp;

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer};

use crate::resilience::circuit_breaker::CircuitBreakerConfig;

pub use datastore::{Datastore, DatastoreCheck, DatastoreError, TcpDatastore};
pub use http::HttpCheck;
pub use tcp::TcpCheck;

/// How a dependency is probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckKind {
    Http,
    Tcp,
    Datastore,
}

impl CheckKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckKind::Http => "http",
            CheckKind::Tcp => "tcp",
            CheckKind::Datastore => "datastore",
        }
    }
}

/// Identity and policy for one monitored dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyConfig {
    pub name: String,
    /// URL for HTTP checks, `host:port` for TCP checks.
    pub target: String,
    pub timeout: Duration,
    pub critical: bool,
    pub kind: CheckKind,
    /// Status code an HTTP check must observe.
    pub expected_status: u16,
    pub headers: BTreeMap<String, String>,
    /// Overrides the registry-wide breaker policy.
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl DependencyConfig {
    pub fn new(name: impl Into<String>, kind: CheckKind, target: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            timeout,
            critical: false,
            kind,
            expected_status: 200,
            headers: BTreeMap::new(),
            circuit_breaker: None,
        }
    }

    pub fn http(name: impl Into<String>, target: impl Into<String>, timeout: Duration) -> Self {
        Self::new(name, CheckKind::Http, target, timeout)
    }

    pub fn tcp(name: impl Into<String>, target: impl Into<String>, timeout: Duration) -> Self {
        Self::new(name, CheckKind::Tcp, target, timeout)
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }
}

/// Outcome of a single check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

/// Result of one probe attempt.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    pub message: String,
    #[serde(serialize_with = "serialize_elapsed")]
    pub duration: Duration,
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    pub critical: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl CheckResult {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Healthy, message)
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(CheckStatus::Unhealthy, message)
    }

    fn with_status(status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            duration: Duration::ZERO,
            timestamp: unix_now(),
            critical: false,
            details: BTreeMap::new(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }
}

/// A check strategy.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Probe `dependency`, giving up after `timeout`.
    async fn probe(&self, dependency: &DependencyConfig, timeout: Duration) -> CheckResult;
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Flatten an error and its sources into one line.
pub(crate) fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn serialize_elapsed<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:?}", duration))
}
