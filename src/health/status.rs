//! Aggregate health snapshots returned by the probe surface.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::checks::{CheckResult, CheckStatus};

/// Reserved key for the primary datastore in `HealthStatus::checks`.
pub const DATASTORE_KEY: &str = "datastore";

/// Service-level snapshot of one evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: CheckStatus,
    pub service: String,
    pub version: String,
    pub environment: String,
    /// Process uptime in whole seconds.
    #[serde(serialize_with = "serialize_secs")]
    pub uptime: Duration,
    pub timestamp: u64,
    pub checks: BTreeMap<String, CheckResult>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == CheckStatus::Healthy
    }

    /// Every critical dependency is healthy.
    pub fn critical_healthy(&self) -> bool {
        self.checks
            .values()
            .filter(|check| check.critical)
            .all(CheckResult::is_healthy)
    }

    /// Every dependency, critical or not, is healthy.
    pub fn total_healthy(&self) -> bool {
        self.checks.values().all(CheckResult::is_healthy)
    }
}

/// Readiness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessLevel {
    FullyReady,
    PartiallyReady,
    NotReady,
}

impl ReadinessLevel {
    pub fn classify(critical_healthy: bool, total_healthy: bool) -> Self {
        if total_healthy {
            ReadinessLevel::FullyReady
        } else if critical_healthy {
            ReadinessLevel::PartiallyReady
        } else {
            ReadinessLevel::NotReady
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessLevel::FullyReady => "fully_ready",
            ReadinessLevel::PartiallyReady => "partially_ready",
            ReadinessLevel::NotReady => "not_ready",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub status: ReadinessLevel,
    pub critical_healthy: bool,
    pub total_healthy: bool,
    pub checks: BTreeMap<String, CheckResult>,
}

impl From<HealthStatus> for ReadinessReport {
    fn from(health: HealthStatus) -> Self {
        let critical_healthy = health.critical_healthy();
        let total_healthy = health.total_healthy();
        Self {
            status: ReadinessLevel::classify(critical_healthy, total_healthy),
            critical_healthy,
            total_healthy,
            checks: health.checks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LivenessReport {
    pub status: &'static str,
    pub service: String,
    pub timestamp: u64,
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(checks: Vec<(&str, CheckResult)>) -> HealthStatus {
        HealthStatus {
            status: CheckStatus::Healthy,
            service: "vocab".into(),
            version: "1.0.0".into(),
            environment: "test".into(),
            uptime: Duration::from_secs(42),
            timestamp: 0,
            checks: checks.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(ReadinessLevel::classify(true, true), ReadinessLevel::FullyReady);
        assert_eq!(ReadinessLevel::classify(true, false), ReadinessLevel::PartiallyReady);
        assert_eq!(ReadinessLevel::classify(false, false), ReadinessLevel::NotReady);
    }

    #[test]
    fn test_non_critical_failure_is_partial() {
        let report = ReadinessReport::from(status(vec![
            (DATASTORE_KEY, CheckResult::healthy("ok").with_critical(true)),
            ("peer-b", CheckResult::unhealthy("timeout")),
        ]));

        assert_eq!(report.status, ReadinessLevel::PartiallyReady);
        assert!(report.critical_healthy);
        assert!(!report.total_healthy);
    }

    #[test]
    fn test_readiness_json_uses_camel_case() {
        let report = ReadinessReport::from(status(vec![]));
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "fully_ready");
        assert_eq!(json["criticalHealthy"], true);
        assert_eq!(json["totalHealthy"], true);
        assert!(json["checks"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_health_json_shape() {
        let json = serde_json::to_value(status(vec![])).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["uptime"], 42);
        assert_eq!(json["service"], "vocab");
    }
}
