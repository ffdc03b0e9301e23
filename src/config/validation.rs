//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Replace out-of-range values with their documented defaults
//! - Drop dependency declarations that cannot be probed
//!
//! # Design Decisions
//! - Returns every problem found, not just the first
//! - Never rejects a configuration: start-up proceeds on defaults
//! - Runs after environment overrides so both sources are covered

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::config::env::url_key;
use crate::config::schema::{HealthConfig, TimeoutConfig};
use crate::health::registry::is_reserved_name;
use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Upper bound for any configured duration.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// A configuration problem that was corrected by falling back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub message: String,
}

impl ConfigWarning {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Correct invalid values in place.
pub fn sanitize(config: &mut HealthConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();
    let timeouts = TimeoutConfig::default();

    let t = &mut config.timeouts;
    non_zero(&mut warnings, "timeouts.default", &mut t.default, timeouts.default);
    non_zero(&mut warnings, "timeouts.datastore", &mut t.datastore, timeouts.datastore);
    non_zero(&mut warnings, "timeouts.http_check", &mut t.http_check, timeouts.http_check);
    non_zero(&mut warnings, "timeouts.tcp_check", &mut t.tcp_check, timeouts.tcp_check);
    non_zero(&mut warnings, "timeouts.probe_deadline", &mut t.probe_deadline, timeouts.probe_deadline);

    sanitize_breaker(&mut warnings, "circuit_breaker", &mut config.circuit_breaker);

    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(config.dependencies.len());
    for mut dep in std::mem::take(&mut config.dependencies) {
        let key = format!("dependencies.{}", dep.name);

        if dep.name.trim().is_empty() {
            warnings.push(ConfigWarning::new("dependencies", "dependency without a name ignored"));
            continue;
        }
        if dep.target.trim().is_empty() {
            warnings.push(ConfigWarning::new(key, "empty target, dependency ignored"));
            continue;
        }
        if is_reserved_name(&dep.name) || url_key(&dep.name) == "DATASTORE_URL" {
            warnings.push(ConfigWarning::new(
                key,
                "name is reserved for the primary datastore, dependency ignored",
            ));
            continue;
        }
        if !seen.insert(dep.name.clone()) {
            warnings.push(ConfigWarning::new(key, "duplicate name, later declaration ignored"));
            continue;
        }
        match dep.timeout {
            Some(timeout) if timeout.is_zero() => {
                warnings.push(ConfigWarning::new(format!("{}.timeout", key), "zero timeout, using check default"));
                dep.timeout = None;
            }
            Some(timeout) if timeout > MAX_DURATION => {
                warnings.push(ConfigWarning::new(
                    format!("{}.timeout", key),
                    format!("exceeds {:?}, using check default", MAX_DURATION),
                ));
                dep.timeout = None;
            }
            _ => {}
        }
        if let Some(status) = dep.expected_status {
            if !(100..=599).contains(&status) {
                warnings.push(ConfigWarning::new(
                    format!("{}.expected_status", key),
                    format!("invalid status {}, using 200", status),
                ));
                dep.expected_status = None;
            }
        }
        if let Some(breaker) = dep.circuit_breaker.as_mut() {
            sanitize_breaker(&mut warnings, &format!("{}.circuit_breaker", key), breaker);
        }
        kept.push(dep);
    }
    config.dependencies = kept;

    warnings
}

fn sanitize_breaker(warnings: &mut Vec<ConfigWarning>, prefix: &str, breaker: &mut CircuitBreakerConfig) {
    let defaults = CircuitBreakerConfig::default();
    if breaker.failure_threshold == 0 {
        warnings.push(ConfigWarning::new(
            format!("{}.failure_threshold", prefix),
            format!("must be at least 1, using {}", defaults.failure_threshold),
        ));
        breaker.failure_threshold = defaults.failure_threshold;
    }
    if breaker.success_threshold == 0 {
        warnings.push(ConfigWarning::new(
            format!("{}.success_threshold", prefix),
            format!("must be at least 1, using {}", defaults.success_threshold),
        ));
        breaker.success_threshold = defaults.success_threshold;
    }
    non_zero(
        warnings,
        &format!("{}.recovery_timeout", prefix),
        &mut breaker.recovery_timeout,
        defaults.recovery_timeout,
    );
}

fn non_zero(warnings: &mut Vec<ConfigWarning>, key: &str, slot: &mut Duration, default: Duration) {
    if slot.is_zero() {
        warnings.push(ConfigWarning::new(key, format!("must be positive, using {:?}", default)));
        *slot = default;
    } else if *slot > MAX_DURATION {
        warnings.push(ConfigWarning::new(
            key,
            format!("exceeds {:?}, using {:?}", MAX_DURATION, default),
        ));
        *slot = default;
    }
}
