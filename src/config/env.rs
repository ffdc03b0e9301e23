//! Environment overrides.
//!
//! # Responsibilities
//! - Layer recognised `KEY=value` options over the file configuration
//! - Apply one `<DEPENDENCY>_URL` override per declared peer
//!
//! # Design Decisions
//! - A malformed value never aborts start-up: the option takes its
//!   documented default and a warning is returned to the caller
//! - Lookup is injected so overrides can be exercised without touching the
//!   process environment

use std::str::FromStr;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::schema::{HealthConfig, LogFormat, ObservabilityConfig, TimeoutConfig};
use crate::config::validation::ConfigWarning;
use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Apply overrides from the process environment.
pub fn apply_env(config: &mut HealthConfig) -> Vec<ConfigWarning> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary key/value lookup.
pub fn apply_overrides<F>(config: &mut HealthConfig, lookup: F) -> Vec<ConfigWarning>
where
    F: Fn(&str) -> Option<String>,
{
    let mut env = Overrides {
        lookup,
        warnings: Vec::new(),
    };
    let timeouts = TimeoutConfig::default();
    let breaker = CircuitBreakerConfig::default();
    let observability = ObservabilityConfig::default();

    env.duration("DEFAULT_TIMEOUT", &mut config.timeouts.default, timeouts.default);
    env.duration("DATASTORE_TIMEOUT", &mut config.timeouts.datastore, timeouts.datastore);
    env.duration("HTTP_CHECK_TIMEOUT", &mut config.timeouts.http_check, timeouts.http_check);
    env.duration("TCP_CHECK_TIMEOUT", &mut config.timeouts.tcp_check, timeouts.tcp_check);
    env.duration("PROBE_DEADLINE", &mut config.timeouts.probe_deadline, timeouts.probe_deadline);

    let cb = &mut config.circuit_breaker;
    env.parsed("CB_FAILURE_THRESHOLD", &mut cb.failure_threshold, breaker.failure_threshold);
    env.duration("CB_RECOVERY_TIMEOUT", &mut cb.recovery_timeout, breaker.recovery_timeout);
    env.parsed("CB_SUCCESS_THRESHOLD", &mut cb.success_threshold, breaker.success_threshold);
    env.flag("CB_ENABLED", &mut cb.enabled, breaker.enabled);

    env.string("SERVICE_NAME", &mut config.service.name);
    env.string("SERVICE_VERSION", &mut config.service.version);
    env.string("ENVIRONMENT", &mut config.service.environment);
    env.string("BIND_ADDRESS", &mut config.listener.bind_address);
    env.flag("PARALLEL_CHECKS", &mut config.aggregator.parallel_checks, false);

    if let Some(url) = env.get("DATASTORE_URL") {
        config.datastore.url = Some(url);
    }
    env.string("DATASTORE_NAME", &mut config.datastore.name);

    let obs = &mut config.observability;
    env.string("LOG_LEVEL", &mut obs.log_level);
    env.log_format("LOG_FORMAT", &mut obs.log_format);
    env.flag("METRICS_ENABLED", &mut obs.metrics_enabled, observability.metrics_enabled);
    env.string("METRICS_ADDRESS", &mut obs.metrics_address);

    for dep in &mut config.dependencies {
        if let Some(url) = env.get(&url_key(&dep.name)) {
            dep.target = url;
        }
    }

    env.warnings
}

/// Environment key carrying the target override for a dependency.
///
/// `user-service` → `USER_SERVICE_URL`.
pub fn url_key(name: &str) -> String {
    let mut key: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    key.push_str("_URL");
    key
}

struct Overrides<F> {
    lookup: F,
    warnings: Vec<ConfigWarning>,
}

impl<F> Overrides<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&mut self, key: &str, slot: &mut String) {
        if let Some(value) = self.get(key) {
            *slot = value;
        }
    }

    fn duration(&mut self, key: &str, slot: &mut Duration, default: Duration) {
        if let Some(raw) = self.get(key) {
            *slot = match parse_duration(&raw) {
                Some(value) if !value.is_zero() => value,
                _ => self.fallback(key, &raw, default, format!("{:?}", default)),
            };
        }
    }

    fn parsed<T: FromStr + Copy + std::fmt::Display>(&mut self, key: &str, slot: &mut T, default: T) {
        if let Some(raw) = self.get(key) {
            *slot = match raw.parse() {
                Ok(value) => value,
                Err(_) => self.fallback(key, &raw, default, default.to_string()),
            };
        }
    }

    fn flag(&mut self, key: &str, slot: &mut bool, default: bool) {
        if let Some(raw) = self.get(key) {
            *slot = match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => self.fallback(key, &raw, default, default.to_string()),
            };
        }
    }

    fn log_format(&mut self, key: &str, slot: &mut LogFormat) {
        if let Some(raw) = self.get(key) {
            *slot = match raw.to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" | "text" => LogFormat::Pretty,
                _ => self.fallback(key, &raw, LogFormat::default(), "pretty".to_string()),
            };
        }
    }

    fn fallback<T>(&mut self, key: &str, raw: &str, default: T, shown: String) -> T {
        self.warnings.push(ConfigWarning::new(
            key,
            format!("invalid value `{}`, using default {}", raw, shown),
        ));
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckKind;
    use crate::config::schema::DependencySettings;
    use std::collections::HashMap;

    fn apply(config: &mut HealthConfig, pairs: &[(&str, &str)]) -> Vec<ConfigWarning> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        apply_overrides(config, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_recognised_options() {
        let mut config = HealthConfig::default();
        let warnings = apply(
            &mut config,
            &[
                ("DEFAULT_TIMEOUT", "20s"),
                ("CB_FAILURE_THRESHOLD", "7"),
                ("CB_RECOVERY_TIMEOUT", "45"),
                ("CB_SUCCESS_THRESHOLD", "3"),
                ("CB_ENABLED", "false"),
                ("DATASTORE_TIMEOUT", "2s"),
                ("HTTP_CHECK_TIMEOUT", "1500ms"),
                ("TCP_CHECK_TIMEOUT", "1"),
                ("SERVICE_NAME", "quiz-service"),
                ("LOG_FORMAT", "json"),
            ],
        );

        assert!(warnings.is_empty());
        assert_eq!(config.timeouts.default, Duration::from_secs(20));
        assert_eq!(config.circuit_breaker.failure_threshold, 7);
        assert_eq!(config.circuit_breaker.recovery_timeout, Duration::from_secs(45));
        assert_eq!(config.circuit_breaker.success_threshold, 3);
        assert!(!config.circuit_breaker.enabled);
        assert_eq!(config.timeouts.datastore, Duration::from_secs(2));
        assert_eq!(config.timeouts.http_check, Duration::from_millis(1500));
        assert_eq!(config.timeouts.tcp_check, Duration::from_secs(1));
        assert_eq!(config.service.name, "quiz-service");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_malformed_values_fall_back_to_defaults() {
        let mut config = HealthConfig::default();
        config.circuit_breaker.failure_threshold = 9;
        config.timeouts.http_check = Duration::from_secs(1);

        let warnings = apply(
            &mut config,
            &[
                ("CB_FAILURE_THRESHOLD", "lots"),
                ("HTTP_CHECK_TIMEOUT", "soon"),
                ("CB_ENABLED", "maybe"),
                ("TCP_CHECK_TIMEOUT", "0"),
            ],
        );

        assert_eq!(warnings.len(), 4);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.timeouts.http_check, Duration::from_secs(5));
        assert!(config.circuit_breaker.enabled);
        assert_eq!(config.timeouts.tcp_check, Duration::from_secs(3));
        assert!(warnings.iter().any(|w| w.key == "CB_FAILURE_THRESHOLD"));
    }

    #[test]
    fn test_dependency_url_override() {
        let mut config = HealthConfig::default();
        config
            .dependencies
            .push(DependencySettings::new("user-service", CheckKind::Http, "http://users:8080"));
        config
            .dependencies
            .push(DependencySettings::new("cache", CheckKind::Tcp, "cache:6379"));

        apply(&mut config, &[("USER_SERVICE_URL", "http://10.0.0.7:8080")]);

        assert_eq!(config.dependencies[0].target, "http://10.0.0.7:8080");
        assert_eq!(config.dependencies[1].target, "cache:6379");
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let mut config = HealthConfig::default();
        let warnings = apply(&mut config, &[("CB_FAILURE_THRESHOLD", "  "), ("DATASTORE_URL", "")]);

        assert!(warnings.is_empty());
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
        assert!(config.datastore.url.is_none());
    }

    #[test]
    fn test_url_key() {
        assert_eq!(url_key("user-service"), "USER_SERVICE_URL");
        assert_eq!(url_key("peer.b"), "PEER_B_URL");
        assert_eq!(url_key("Auth"), "AUTH_URL");
    }
}
