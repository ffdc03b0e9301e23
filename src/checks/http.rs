//! HTTP health endpoint check.
//!
//! Issues `GET <target>/health` and compares the response status against the
//! dependency's expected status code.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::{self, Instant};
use url::Url;

use super::{error_chain, CheckResult, DependencyConfig, Probe};

const USER_AGENT: &str = "dependency-health-check";

/// Build the health URL for a target, tolerating a missing scheme or a
/// trailing slash.
pub fn health_url(target: &str) -> Result<Url, url::ParseError> {
    let target = target.trim();
    let mut url = if target.contains("://") {
        Url::parse(target)?
    } else {
        Url::parse(&format!("http://{}", target))?
    };
    let path = format!("{}/health", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

/// HTTP check strategy backed by a shared, pooled client.
#[derive(Clone)]
pub struct HttpCheck {
    client: Client<HttpConnector, Body>,
}

impl HttpCheck {
    /// `connect_timeout` bounds connection establishment independently of
    /// the per-check deadline.
    pub fn new(connect_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client }
    }
}

#[async_trait]
impl Probe for HttpCheck {
    async fn probe(&self, dependency: &DependencyConfig, timeout: Duration) -> CheckResult {
        let started = Instant::now();

        let url = match health_url(&dependency.target) {
            Ok(url) => url,
            Err(e) => {
                return CheckResult::unhealthy(format!("invalid target `{}`: {}", dependency.target, e))
                    .with_detail("url", dependency.target.clone());
            }
        };

        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .header(header::USER_AGENT, USER_AGENT);
        for (name, value) in &dependency.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let request = match builder.body(Body::empty()) {
            Ok(req) => req,
            Err(e) => {
                return CheckResult::unhealthy(format!("failed to build health check request: {}", e))
                    .with_detail("url", url.as_str());
            }
        };

        let mut status_code = None;
        let result = match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                status_code = Some(status);
                if status == dependency.expected_status {
                    CheckResult::healthy(format!("HTTP {}", status))
                } else {
                    CheckResult::unhealthy(format!(
                        "unexpected status code {} (expected {})",
                        status, dependency.expected_status
                    ))
                }
            }
            Ok(Err(e)) => CheckResult::unhealthy(format!("request failed: {}", error_chain(&e))),
            Err(_) => CheckResult::unhealthy(format!("timeout: no response within {:?}", timeout)),
        };

        if !result.is_healthy() {
            tracing::warn!(
                dependency = %dependency.name,
                url = %url,
                message = %result.message,
                "HTTP check failed"
            );
        }

        let result = result
            .with_duration(started.elapsed())
            .with_detail("url", url.as_str());
        match status_code {
            Some(status) => result.with_detail("status_code", status),
            None => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    /// Serve one canned status line per connection, capturing the raw request.
    async fn canned_backend(status_line: &'static str) -> (String, Arc<Mutex<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let captured = Arc::new(Mutex::new(String::new()));
        let sink = captured.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                *sink.lock().await = String::from_utf8_lossy(&buf[..n]).into_owned();
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), captured)
    }

    #[test]
    fn test_health_url() {
        assert_eq!(health_url("http://peer:8080").unwrap().as_str(), "http://peer:8080/health");
        assert_eq!(health_url("http://peer:8080/").unwrap().as_str(), "http://peer:8080/health");
        assert_eq!(health_url("peer:8080/api").unwrap().as_str(), "http://peer:8080/api/health");
    }

    #[tokio::test]
    async fn test_expected_status_is_healthy() {
        let (target, captured) = canned_backend("200 OK").await;
        let dep = DependencyConfig::http("peer", target, Duration::from_secs(2))
            .with_header("x-api-key", "secret");

        let result = HttpCheck::new(Duration::from_secs(2))
            .probe(&dep, Duration::from_secs(2))
            .await;

        assert!(result.is_healthy(), "{}", result.message);
        assert_eq!(result.details["status_code"], 200);
        assert!(result.details["url"].as_str().unwrap().ends_with("/health"));

        let request = captured.lock().await.to_lowercase();
        assert!(request.starts_with("get /health http/1.1"));
        assert!(request.contains("x-api-key: secret"));
    }

    #[tokio::test]
    async fn test_status_mismatch_is_unhealthy() {
        let (target, _) = canned_backend("503 Service Unavailable").await;
        let dep = DependencyConfig::http("peer", target, Duration::from_secs(2));

        let result = HttpCheck::new(Duration::from_secs(2))
            .probe(&dep, Duration::from_secs(2))
            .await;

        assert!(!result.is_healthy());
        assert_eq!(result.message, "unexpected status code 503 (expected 200)");
        assert_eq!(result.details["status_code"], 503);
    }

    #[tokio::test]
    async fn test_custom_expected_status() {
        let (target, _) = canned_backend("204 No Content").await;
        let dep = DependencyConfig::http("peer", target, Duration::from_secs(2)).with_expected_status(204);

        let result = HttpCheck::new(Duration::from_secs(2))
            .probe(&dep, Duration::from_secs(2))
            .await;

        assert!(result.is_healthy(), "{}", result.message);
    }

    #[tokio::test]
    async fn test_silent_backend_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        let dep = DependencyConfig::http("peer", format!("http://{}", addr), Duration::from_secs(2));

        let result = HttpCheck::new(Duration::from_secs(2))
            .probe(&dep, Duration::from_millis(200))
            .await;

        assert!(!result.is_healthy());
        assert!(result.message.contains("timeout"));
        assert!(result.details.get("status_code").is_none());
    }

    #[tokio::test]
    async fn test_connection_refused_is_unhealthy() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let dep = DependencyConfig::http("peer", format!("http://{}", addr), Duration::from_secs(2));

        let result = HttpCheck::new(Duration::from_secs(2))
            .probe(&dep, Duration::from_secs(2))
            .await;

        assert!(!result.is_healthy());
        assert!(result.message.starts_with("request failed"));
    }
}
