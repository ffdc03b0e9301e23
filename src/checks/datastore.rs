//! Datastore connectivity check.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};

use super::{error_chain, CheckResult, DependencyConfig, Probe};

#[derive(Debug, Error)]
pub enum DatastoreError {
    #[error("ping timed out after {0:?}")]
    Timeout(Duration),

    #[error("datastore unreachable")]
    Unreachable(#[source] std::io::Error),

    #[error("ping failed: {0}")]
    Ping(String),
}

/// A pingable datastore handle supplied by the hosting service.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Name reported in check details (e.g. the database name).
    fn name(&self) -> &str;

    /// Lightweight connectivity probe bounded by `timeout`.
    async fn ping(&self, timeout: Duration) -> Result<(), DatastoreError>;
}

/// Probes a datastore handle.
pub struct DatastoreCheck {
    handle: Arc<dyn Datastore>,
}

impl DatastoreCheck {
    pub fn new(handle: Arc<dyn Datastore>) -> Self {
        Self { handle }
    }

    pub fn handle_name(&self) -> &str {
        self.handle.name()
    }
}

#[async_trait]
impl Probe for DatastoreCheck {
    async fn probe(&self, _dependency: &DependencyConfig, timeout: Duration) -> CheckResult {
        let started = Instant::now();

        let result = match time::timeout(timeout, self.handle.ping(timeout)).await {
            Ok(Ok(())) => CheckResult::healthy("datastore reachable"),
            Ok(Err(DatastoreError::Timeout(after))) => {
                CheckResult::unhealthy(format!("timeout: datastore ping exceeded {:?}", after))
            }
            Ok(Err(e)) => CheckResult::unhealthy(error_chain(&e)),
            Err(_) => CheckResult::unhealthy(format!("timeout: datastore ping exceeded {:?}", timeout)),
        };

        if !result.is_healthy() {
            tracing::warn!(datastore = %self.handle.name(), message = %result.message, "Datastore check failed");
        }

        result
            .with_duration(started.elapsed())
            .with_detail("datastore", self.handle.name())
    }
}

/// Datastore handle whose ping is a TCP dial to the server address.
#[derive(Debug, Clone)]
pub struct TcpDatastore {
    name: String,
    address: String,
}

impl TcpDatastore {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        let address = address.into();
        let address = super::tcp::dial_address(&address).unwrap_or(address);
        Self {
            name: name.into(),
            address,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Datastore for TcpDatastore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn ping(&self, timeout: Duration) -> Result<(), DatastoreError> {
        let stream = time::timeout(timeout, TcpStream::connect(&self.address))
            .await
            .map_err(|_| DatastoreError::Timeout(timeout))?
            .map_err(DatastoreError::Unreachable)?;
        drop(stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::CheckKind;

    struct FakeDatastore {
        outcome: fn() -> Result<(), DatastoreError>,
        delay: Duration,
    }

    #[async_trait]
    impl Datastore for FakeDatastore {
        fn name(&self) -> &str {
            "users"
        }

        async fn ping(&self, _timeout: Duration) -> Result<(), DatastoreError> {
            time::sleep(self.delay).await;
            (self.outcome)()
        }
    }

    fn dependency() -> DependencyConfig {
        DependencyConfig::new("datastore", CheckKind::Datastore, "users", Duration::from_secs(5))
    }

    fn check(outcome: fn() -> Result<(), DatastoreError>, delay: Duration) -> DatastoreCheck {
        DatastoreCheck::new(Arc::new(FakeDatastore { outcome, delay }))
    }

    #[tokio::test]
    async fn test_ping_success_is_healthy() {
        let result = check(|| Ok(()), Duration::ZERO)
            .probe(&dependency(), Duration::from_secs(1))
            .await;

        assert!(result.is_healthy());
        assert_eq!(result.details["datastore"], "users");
    }

    #[tokio::test]
    async fn test_ping_error_is_unhealthy() {
        let result = check(|| Err(DatastoreError::Ping("auth failed".into())), Duration::ZERO)
            .probe(&dependency(), Duration::from_secs(1))
            .await;

        assert!(!result.is_healthy());
        assert_eq!(result.message, "ping failed: auth failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_ping_times_out() {
        let result = check(|| Ok(()), Duration::from_secs(10))
            .probe(&dependency(), Duration::from_secs(1))
            .await;

        assert!(!result.is_healthy());
        assert!(result.message.contains("timeout"));
    }

    #[tokio::test]
    async fn test_tcp_datastore_ping() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let store = TcpDatastore::new("primary", format!("tcp://{}", addr));
        assert_eq!(store.address(), addr.to_string());
        assert!(store.ping(Duration::from_secs(1)).await.is_ok());

        drop(listener);
        let err = store.ping(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, DatastoreError::Unreachable(_)));
    }
}
