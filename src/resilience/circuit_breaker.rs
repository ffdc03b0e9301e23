//! Circuit breaker for dependency protection.
//!
//! # States
//! - Closed: checks run normally
//! - Open: dependency assumed down, checks short-circuit
//! - Half-Open: cool-down elapsed, trial checks admitted
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: can_execute() after recovery_timeout
//! Half-Open → Closed: consecutive_successes >= success_threshold
//! Half-Open → Open: any trial failure
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, each behind its own lock
//! - Fail fast in Open state (no network round-trip)
//! - Every trial is admitted in Half-Open; concurrent passes may all probe

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::observability::metrics;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Breaker policy. Loaded once at start-up, optionally overridden per dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,

    /// Cool-down before a trial check is admitted.
    #[serde(with = "crate::config::duration::human")]
    pub recovery_timeout: Duration,

    /// Consecutive trial successes before the breaker closes.
    pub success_threshold: u32,

    /// When false the breaker never blocks and never changes state.
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
            enabled: true,
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
}

/// Point-in-time view of a breaker, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub enabled: bool,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    /// Milliseconds since the last recorded failure, if any.
    pub last_failure_ms_ago: Option<u64>,
}

/// Per-dependency failure/recovery state machine.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let breaker = Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure: None,
            }),
        };
        metrics::record_breaker_state(&breaker.name, CircuitState::Closed);
        breaker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Whether a check may run now.
    ///
    /// An open breaker whose cool-down has elapsed moves to half-open and
    /// admits the caller as a trial.
    pub fn can_execute(&self) -> bool {
        if !self.config.enabled {
            return true;
        }

        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = inner
                    .last_failure
                    .map_or(true, |at| at.elapsed() >= self.config.recovery_timeout);
                if cooled_down {
                    self.transition(&mut inner, CircuitState::HalfOpen);
                }
                cooled_down
            }
        }
    }

    /// Report a successful check.
    pub fn record_success(&self) {
        if !self.config.enabled {
            return;
        }

        let mut inner = self.lock();
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                inner.consecutive_successes = 0;
                self.transition(&mut inner, CircuitState::Closed);
            }
        }
    }

    /// Report a failed check.
    pub fn record_failure(&self) {
        if !self.config.enabled {
            return;
        }

        let mut inner = self.lock();
        inner.last_failure = Some(Instant::now());
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);

        let trial_failed = inner.state == CircuitState::HalfOpen;
        let threshold_reached = inner.consecutive_failures >= self.config.failure_threshold;

        if inner.state != CircuitState::Open && (trial_failed || threshold_reached) {
            inner.consecutive_successes = 0;
            self.transition(&mut inner, CircuitState::Open);
        }
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            enabled: self.config.enabled,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            last_failure_ms_ago: inner
                .last_failure
                .map(|at| at.elapsed().as_millis() as u64),
        }
    }

    fn transition(&self, inner: &mut BreakerState, to: CircuitState) {
        let from = inner.state;
        inner.state = to;

        match to {
            CircuitState::Open => tracing::warn!(
                dependency = %self.name,
                from = from.as_str(),
                consecutive_failures = inner.consecutive_failures,
                "Circuit breaker opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                dependency = %self.name,
                "Circuit breaker half-open, admitting trial checks"
            ),
            CircuitState::Closed => {
                inner.consecutive_failures = 0;
                tracing::info!(dependency = %self.name, "Circuit breaker closed");
            }
        }

        metrics::record_breaker_state(&self.name, to);
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn breaker(failure_threshold: u32, recovery_secs: u64, success_threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "peer",
            CircuitBreakerConfig {
                failure_threshold,
                recovery_timeout: Duration::from_secs(recovery_secs),
                success_threshold,
                enabled: true,
            },
        )
    }

    #[test]
    fn test_starts_closed() {
        let cb = breaker(5, 30, 2);
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_execute());
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_after_threshold() {
        let cb = breaker(5, 30, 2);

        for _ in 0..4 {
            cb.record_failure();
        }
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.can_execute());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.can_execute());
    }

    #[test]
    fn test_success_resets_failure_count() {
        let cb = breaker(3, 30, 2);
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        cb.record_failure();

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_admission_after_recovery_timeout() {
        let cb = breaker(5, 30, 2);
        for _ in 0..5 {
            cb.record_failure();
        }

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!cb.can_execute());
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_closes_after_successes() {
        let cb = breaker(5, 30, 2);
        for _ in 0..5 {
            cb.record_failure();
        }
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.can_execute());

        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot().consecutive_successes, 1);

        cb.record_success();
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.consecutive_successes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_failure_reopens() {
        let cb = breaker(5, 30, 2);
        for _ in 0..5 {
            cb.record_failure();
        }
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.can_execute());

        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot().consecutive_successes, 0);

        // The cool-down restarts from the trial failure.
        assert!(!cb.can_execute());
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cb.can_execute());
    }

    #[test]
    fn test_disabled_breaker_never_blocks() {
        let cb = CircuitBreaker::new(
            "peer",
            CircuitBreakerConfig {
                failure_threshold: 1,
                enabled: false,
                ..Default::default()
            },
        );

        for _ in 0..10 {
            cb.record_failure();
        }
        assert!(cb.can_execute());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_concurrent_failures_open_once() {
        let cb = Arc::new(breaker(50, 30, 2));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cb = cb.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        cb.record_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = cb.snapshot();
        assert_eq!(snapshot.consecutive_failures, 80);
        assert_eq!(snapshot.state, CircuitState::Open);
    }
}
