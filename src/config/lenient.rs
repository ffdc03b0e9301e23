//! Lenient pre-pass over the raw TOML document.
//!
//! Malformed durations, thresholds and flags are removed before typed
//! deserialization, so the affected option takes its serde default and the
//! problem surfaces as a [`ConfigWarning`] instead of a parse error.

use toml::{Table, Value};

use crate::config::duration::parse_duration;
use crate::config::validation::ConfigWarning;

#[derive(Debug, Clone, Copy)]
enum Expect {
    Duration,
    Count,
    Status,
    Flag,
    Section,
}

impl Expect {
    fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Expect::Duration, Value::Integer(n)) => *n >= 0,
            (Expect::Duration, Value::String(s)) => parse_duration(s).is_some(),
            (Expect::Count, Value::Integer(n)) => u32::try_from(*n).is_ok(),
            (Expect::Status, Value::Integer(n)) => u16::try_from(*n).is_ok(),
            (Expect::Flag, Value::Boolean(_)) => true,
            (Expect::Section, Value::Table(_)) => true,
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Expect::Duration => "a duration such as 5, \"250ms\" or \"2m\"",
            Expect::Count => "a non-negative integer",
            Expect::Status => "an HTTP status code",
            Expect::Flag => "true or false",
            Expect::Section => "a table",
        }
    }
}

const TIMEOUT_KEYS: [&str; 5] = ["default", "datastore", "http_check", "tcp_check", "probe_deadline"];

/// Drop every malformed option from `doc`, returning one warning per option.
pub fn scrub(doc: &mut Table) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if let Some(timeouts) = section(&mut warnings, doc, "timeouts", "timeouts") {
        for key in TIMEOUT_KEYS {
            check(&mut warnings, timeouts, "timeouts", key, Expect::Duration);
        }
    }
    if let Some(breaker) = section(&mut warnings, doc, "circuit_breaker", "circuit_breaker") {
        scrub_breaker(&mut warnings, breaker, "circuit_breaker");
    }
    if let Some(aggregator) = section(&mut warnings, doc, "aggregator", "aggregator") {
        check(&mut warnings, aggregator, "aggregator", "parallel_checks", Expect::Flag);
    }
    if let Some(observability) = section(&mut warnings, doc, "observability", "observability") {
        check(&mut warnings, observability, "observability", "metrics_enabled", Expect::Flag);
    }

    if let Some(Value::Array(dependencies)) = doc.get_mut("dependencies") {
        for (i, dep) in dependencies.iter_mut().enumerate() {
            let Value::Table(dep) = dep else { continue };
            let prefix = match dep.get("name").and_then(Value::as_str) {
                Some(name) => format!("dependencies.{}", name),
                None => format!("dependencies[{}]", i),
            };

            check(&mut warnings, dep, &prefix, "timeout", Expect::Duration);
            check(&mut warnings, dep, &prefix, "expected_status", Expect::Status);
            check(&mut warnings, dep, &prefix, "critical", Expect::Flag);
            let breaker_key = format!("{}.circuit_breaker", prefix);
            if let Some(breaker) = section(&mut warnings, dep, "circuit_breaker", &breaker_key) {
                scrub_breaker(&mut warnings, breaker, &breaker_key);
            }
        }
    }

    warnings
}

fn scrub_breaker(warnings: &mut Vec<ConfigWarning>, breaker: &mut Table, prefix: &str) {
    check(warnings, breaker, prefix, "failure_threshold", Expect::Count);
    check(warnings, breaker, prefix, "success_threshold", Expect::Count);
    check(warnings, breaker, prefix, "recovery_timeout", Expect::Duration);
    check(warnings, breaker, prefix, "enabled", Expect::Flag);
}

/// The table under `key`, removing it first if it is not a table.
fn section<'a>(
    warnings: &mut Vec<ConfigWarning>,
    doc: &'a mut Table,
    key: &str,
    path: &str,
) -> Option<&'a mut Table> {
    if doc.get(key).is_some_and(|v| !Expect::Section.accepts(v)) {
        doc.remove(key);
        warnings.push(ConfigWarning::new(path, "expected a table, using defaults"));
    }
    doc.get_mut(key).and_then(Value::as_table_mut)
}

fn check(warnings: &mut Vec<ConfigWarning>, table: &mut Table, prefix: &str, key: &str, expect: Expect) {
    let Some(value) = table.get(key) else { return };
    if expect.accepts(value) {
        return;
    }

    warnings.push(ConfigWarning::new(
        format!("{}.{}", prefix, key),
        format!("invalid value {}, expected {}; using default", value, expect.describe()),
    ));
    table.remove(key);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(raw: &str) -> Table {
        toml::from_str::<Table>(raw).unwrap()
    }

    #[test]
    fn test_well_formed_document_is_untouched() {
        let raw = r#"
            [timeouts]
            datastore = "2s"
            probe_deadline = 20

            [circuit_breaker]
            failure_threshold = 3
            enabled = false

            [[dependencies]]
            name = "auth"
            target = "http://auth"
            timeout = "500ms"
            expected_status = 204
        "#;
        let mut table = doc(raw);

        assert!(scrub(&mut table).is_empty());
        assert_eq!(table, doc(raw));
    }

    #[test]
    fn test_malformed_values_are_removed() {
        let mut table = doc(
            r#"
            [timeouts]
            datastore = "soon"
            tcp_check = -1

            [circuit_breaker]
            failure_threshold = "five"
            recovery_timeout = "30s"

            [[dependencies]]
            name = "auth"
            target = "http://auth"
            timeout = "fast"
            circuit_breaker = { success_threshold = 99999999999 }
            "#,
        );

        let warnings = scrub(&mut table);
        let keys: Vec<_> = warnings.iter().map(|w| w.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "timeouts.datastore",
                "timeouts.tcp_check",
                "circuit_breaker.failure_threshold",
                "dependencies.auth.timeout",
                "dependencies.auth.circuit_breaker.success_threshold",
            ]
        );
        assert!(table["timeouts"].get("datastore").is_none());
        assert_eq!(table["circuit_breaker"]["recovery_timeout"].as_str(), Some("30s"));
    }

    #[test]
    fn test_non_table_section_is_replaced() {
        let mut table = doc("timeouts = 5\n");

        let warnings = scrub(&mut table);

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].key, "timeouts");
        assert!(table.get("timeouts").is_none());
    }
}
