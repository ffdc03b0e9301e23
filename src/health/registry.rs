//! Dependency registry.
//!
//! # Responsibilities
//! - Map dependency name → configuration + circuit breaker
//! - Keep registration order for deterministic check passes
//! - Allow reconfiguration while probe passes are in flight
//!
//! # Design Decisions
//! - Breaker is created once per name and survives re-registration
//! - Configs are swapped atomically; readers never see a torn entry
//! - The primary datastore's result key is reserved and cannot be registered

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::checks::DependencyConfig;
use crate::health::status::DATASTORE_KEY;
use crate::resilience::circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("dependency name `{0}` is reserved for the primary datastore")]
    ReservedName(String),
}

/// Whether `name` collides with the primary datastore's result key.
pub fn is_reserved_name(name: &str) -> bool {
    name.trim().eq_ignore_ascii_case(DATASTORE_KEY)
}

/// A registered dependency and the breaker that guards it.
#[derive(Debug)]
pub struct RegisteredDependency {
    config: ArcSwap<DependencyConfig>,
    breaker: Arc<CircuitBreaker>,
    order: u64,
}

impl RegisteredDependency {
    pub fn config(&self) -> Arc<DependencyConfig> {
        self.config.load_full()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

/// Concurrency-safe registry of monitored dependencies.
#[derive(Debug)]
pub struct DependencyRegistry {
    entries: DashMap<String, Arc<RegisteredDependency>>,
    next_order: AtomicU64,
    default_breaker: CircuitBreakerConfig,
}

impl DependencyRegistry {
    /// `default_breaker` applies to dependencies without their own override.
    pub fn new(default_breaker: CircuitBreakerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            next_order: AtomicU64::new(0),
            default_breaker,
        }
    }

    /// Insert or update a dependency, returning its breaker.
    ///
    /// Updating an existing name swaps the config in place; the breaker and
    /// its position in check order are kept, and so is the breaker policy
    /// it was created with.
    pub fn register(&self, config: DependencyConfig) -> Result<Arc<CircuitBreaker>, RegistryError> {
        if is_reserved_name(&config.name) {
            return Err(RegistryError::ReservedName(config.name));
        }

        let breaker = match self.entries.entry(config.name.clone()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if **existing.config.load() != config {
                    tracing::info!(
                        dependency = %config.name,
                        target = %config.target,
                        "Dependency reconfigured"
                    );
                    existing.config.store(Arc::new(config));
                }
                existing.breaker.clone()
            }
            Entry::Vacant(entry) => {
                let breaker_config = config
                    .circuit_breaker
                    .clone()
                    .unwrap_or_else(|| self.default_breaker.clone());
                let breaker = Arc::new(CircuitBreaker::new(config.name.clone(), breaker_config));

                tracing::info!(
                    dependency = %config.name,
                    kind = config.kind.as_str(),
                    target = %config.target,
                    critical = config.critical,
                    "Dependency registered"
                );

                entry.insert(Arc::new(RegisteredDependency {
                    config: ArcSwap::from_pointee(config),
                    breaker: breaker.clone(),
                    order: self.next_order.fetch_add(1, Ordering::Relaxed),
                }));
                breaker
            }
        };
        Ok(breaker)
    }

    pub fn get(&self, name: &str) -> Option<DependencyConfig> {
        self.entries.get(name).map(|entry| entry.config().as_ref().clone())
    }

    /// All configs in registration order.
    pub fn list(&self) -> Vec<DependencyConfig> {
        self.entries()
            .iter()
            .map(|entry| entry.config().as_ref().clone())
            .collect()
    }

    /// All entries in registration order.
    pub fn entries(&self) -> Vec<Arc<RegisteredDependency>> {
        let mut entries: Vec<_> = self.entries.iter().map(|r| r.value().clone()).collect();
        entries.sort_by_key(|entry| entry.order);
        entries
    }

    pub fn breaker(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.entries.get(name).map(|entry| entry.breaker.clone())
    }

    pub fn breaker_snapshots(&self) -> Vec<BreakerSnapshot> {
        self.entries()
            .iter()
            .map(|entry| entry.breaker.snapshot())
            .collect()
    }

    pub fn remove(&self, name: &str) -> bool {
        let removed = self.entries.remove(name).is_some();
        if removed {
            tracing::info!(dependency = %name, "Dependency removed");
        }
        removed
    }

    /// Make the registry match `configs`: upsert every entry, drop the rest.
    pub fn reconcile(&self, configs: Vec<DependencyConfig>) {
        let wanted: HashSet<String> = configs.iter().map(|c| c.name.clone()).collect();

        for config in configs {
            if let Err(e) = self.register(config) {
                tracing::warn!(error = %e, "Dependency skipped");
            }
        }

        let stale: Vec<String> = self
            .entries
            .iter()
            .filter(|r| !wanted.contains(r.key()))
            .map(|r| r.key().clone())
            .collect();
        for name in stale {
            self.remove(&name);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DependencyRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
