//! Raw TCP dial check.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::time::{self, Instant};
use url::Url;

use super::{CheckResult, DependencyConfig, Probe};

/// Resolve a target into a `host:port` dial address.
///
/// Accepts `host:port`, `tcp://host:port`, or any URL with a host, in which
/// case the scheme's default port is used when none is given.
pub fn dial_address(target: &str) -> Option<String> {
    let target = target.trim();
    if let Some(rest) = target.strip_prefix("tcp://") {
        return Some(rest.trim_end_matches('/').to_string());
    }
    if !target.contains("://") {
        return Some(target.to_string());
    }

    let url = Url::parse(target).ok()?;
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}

/// Dials the target and closes the connection immediately.
#[derive(Debug, Clone, Default)]
pub struct TcpCheck;

impl TcpCheck {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Probe for TcpCheck {
    async fn probe(&self, dependency: &DependencyConfig, timeout: Duration) -> CheckResult {
        let started = Instant::now();

        let Some(address) = dial_address(&dependency.target) else {
            return CheckResult::unhealthy(format!("invalid tcp target `{}`", dependency.target))
                .with_detail("address", dependency.target.clone());
        };

        let result = match time::timeout(timeout, TcpStream::connect(&address)).await {
            Ok(Ok(stream)) => {
                drop(stream);
                CheckResult::healthy("connection established")
            }
            Ok(Err(e)) => CheckResult::unhealthy(format!("connection failed: {}", e)),
            Err(_) => CheckResult::unhealthy(format!("timeout: dial exceeded {:?}", timeout)),
        };

        if !result.is_healthy() {
            tracing::warn!(
                dependency = %dependency.name,
                address = %address,
                message = %result.message,
                "TCP check failed"
            );
        }

        result
            .with_duration(started.elapsed())
            .with_detail("address", address)
    }
}
