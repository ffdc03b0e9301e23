//! Health aggregation.
//!
//! # Responsibilities
//! - Run one evaluation pass over the datastore and every registered peer
//! - Gate peer checks through their circuit breakers
//! - Bound every check by `min(dependency timeout, remaining pass deadline)`
//! - Fold results into health, readiness and liveness verdicts
//!
//! # Design Decisions
//! - Pull-based: a pass runs per probe request, nothing runs in the background
//! - The primary datastore bypasses breakers and is always critical
//! - Results are keyed by name, so check order never changes the verdict

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::time::{self, Instant};

use crate::checks::{
    unix_now, CheckKind, CheckResult, CheckStatus, Datastore, DatastoreCheck, DependencyConfig, HttpCheck,
    Probe, TcpCheck,
};
use crate::config::{HealthConfig, ServiceConfig};
use crate::health::registry::{DependencyRegistry, RegisteredDependency};
use crate::health::status::{HealthStatus, LivenessReport, ReadinessReport, DATASTORE_KEY};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::BreakerSnapshot;

/// Roughly 30 years.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Orchestrates evaluation passes.
pub struct HealthAggregator {
    registry: Arc<DependencyRegistry>,
    probes: HashMap<CheckKind, Arc<dyn Probe>>,
    primary: Option<DependencyConfig>,
    service: ServiceConfig,
    parallel: bool,
    started_at: Instant,
}

impl HealthAggregator {
    /// An aggregator with no strategies installed.
    pub fn new(registry: Arc<DependencyRegistry>, service: ServiceConfig) -> Self {
        Self {
            registry,
            probes: HashMap::new(),
            primary: None,
            service,
            parallel: false,
            started_at: Instant::now(),
        }
    }

    /// An aggregator with the HTTP and TCP strategies and, when given, the
    /// primary datastore.
    pub fn from_config(
        config: &HealthConfig,
        registry: Arc<DependencyRegistry>,
        datastore: Option<Arc<dyn Datastore>>,
    ) -> Self {
        let aggregator = Self::new(registry, config.service.clone())
            .with_probe(CheckKind::Http, Arc::new(HttpCheck::new(config.timeouts.default)))
            .with_probe(CheckKind::Tcp, Arc::new(TcpCheck::new()))
            .parallel(config.aggregator.parallel_checks);

        match datastore {
            Some(handle) => aggregator.with_datastore(handle, config.timeouts.datastore),
            None => aggregator,
        }
    }

    /// Install or replace the strategy for a check kind.
    pub fn with_probe(mut self, kind: CheckKind, probe: Arc<dyn Probe>) -> Self {
        self.probes.insert(kind, probe);
        self
    }

    /// Monitor `handle` as the primary datastore.
    ///
    /// Registry dependencies of kind `datastore` are probed through the same
    /// handle.
    pub fn with_datastore(mut self, handle: Arc<dyn Datastore>, timeout: Duration) -> Self {
        let primary = DependencyConfig::new(DATASTORE_KEY, CheckKind::Datastore, handle.name(), timeout)
            .critical(true);
        self.primary = Some(primary);
        self.probes
            .insert(CheckKind::Datastore, Arc::new(DatastoreCheck::new(handle)));
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn registry(&self) -> &Arc<DependencyRegistry> {
        &self.registry
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Run one evaluation pass bounded by `overall_deadline`.
    pub async fn evaluate(&self, overall_deadline: Duration) -> HealthStatus {
        let deadline = pass_deadline(Instant::now(), overall_deadline);
        let mut checks = BTreeMap::new();

        if let Some(primary) = &self.primary {
            let result = match remaining(deadline) {
                Some(budget) => self.run_probe(primary, budget.min(primary.timeout)).await,
                None => deadline_exceeded(),
            };
            self.observe(DATASTORE_KEY, &result);
            checks.insert(DATASTORE_KEY.to_string(), result.with_critical(true));
        }

        let entries = self.registry.entries();
        let results = if self.parallel {
            join_all(entries.iter().map(|entry| self.check_dependency(entry, deadline))).await
        } else {
            let mut results = Vec::with_capacity(entries.len());
            for entry in &entries {
                results.push(self.check_dependency(entry, deadline).await);
            }
            results
        };
        checks.extend(results);

        let status = if checks
            .values()
            .filter(|check| check.critical)
            .all(CheckResult::is_healthy)
        {
            CheckStatus::Healthy
        } else {
            CheckStatus::Unhealthy
        };

        tracing::debug!(
            status = ?status,
            checks = checks.len(),
            "Evaluation pass complete"
        );

        HealthStatus {
            status,
            service: self.service.name.clone(),
            version: self.service.version.clone(),
            environment: self.service.environment.clone(),
            uptime: self.uptime(),
            timestamp: unix_now(),
            checks,
        }
    }

    pub async fn readiness(&self, overall_deadline: Duration) -> ReadinessReport {
        ReadinessReport::from(self.evaluate(overall_deadline).await)
    }

    /// Liveness never probes dependencies.
    pub fn liveness(&self) -> LivenessReport {
        LivenessReport {
            status: "alive",
            service: self.service.name.clone(),
            timestamp: unix_now(),
        }
    }

    pub fn breakers(&self) -> Vec<BreakerSnapshot> {
        self.registry.breaker_snapshots()
    }

    async fn check_dependency(&self, entry: &RegisteredDependency, deadline: Instant) -> (String, CheckResult) {
        let config = entry.config();
        let breaker = entry.breaker();

        let Some(budget) = remaining(deadline) else {
            tracing::warn!(dependency = %config.name, "Skipping check, pass deadline exceeded");
            let result = deadline_exceeded().with_critical(config.critical);
            self.observe(&config.name, &result);
            return (config.name.clone(), result);
        };

        if !breaker.can_execute() {
            tracing::debug!(dependency = %config.name, "Circuit breaker open, skipping check");
            let result = CheckResult::unhealthy(format!("circuit breaker open for {}", config.name))
                .with_critical(config.critical)
                .with_detail("circuit_breaker", breaker.state().as_str());
            self.observe(&config.name, &result);
            return (config.name.clone(), result);
        }

        let result = self.run_probe(&config, budget.min(config.timeout)).await;
        if result.is_healthy() {
            breaker.record_success();
        } else {
            breaker.record_failure();
        }
        self.observe(&config.name, &result);

        (config.name.clone(), result.with_critical(config.critical))
    }

    async fn run_probe(&self, config: &DependencyConfig, timeout: Duration) -> CheckResult {
        let Some(probe) = self.probes.get(&config.kind) else {
            return CheckResult::unhealthy(format!("no probe configured for {} checks", config.kind.as_str()));
        };

        let started = Instant::now();
        match time::timeout(timeout, probe.probe(config, timeout)).await {
            Ok(result) => result,
            Err(_) => CheckResult::unhealthy(format!("timeout: check abandoned after {:?}", timeout))
                .with_duration(started.elapsed()),
        }
    }

    fn observe(&self, name: &str, result: &CheckResult) {
        metrics::record_check(name, result.is_healthy(), result.duration);
    }
}

/// Deadlines too far out to represent are treated as unbounded.
fn pass_deadline(now: Instant, budget: Duration) -> Instant {
    now.checked_add(budget)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

fn remaining(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}

fn deadline_exceeded() -> CheckResult {
    CheckResult::unhealthy("timeout: overall deadline exceeded")
}
