//! Dependency health monitor.
//!
//! Hosts the probe surface for a service and its declared dependencies.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                 HEALTH MONITOR                   │
//!                        │                                                  │
//!   Orchestrator poll    │  ┌─────────┐    ┌────────────┐    ┌──────────┐   │
//!   ─────────────────────┼─▶│  http   │───▶│ aggregator │───▶│ registry │   │
//!                        │  │ server  │    │  (1 pass)  │    │ + breaker│   │
//!                        │  └─────────┘    └─────┬──────┘    └──────────┘   │
//!                        │                       │                          │
//!                        │                       ▼                          │
//!   JSON verdict         │               ┌──────────────┐                   │
//!   ◀────────────────────┼───────────────│    checks    │◀──────────────────┼── Datastore,
//!                        │               │ ds/http/tcp  │                   │   peer services
//!                        │               └──────────────┘                   │
//!                        │  ┌───────────────────────────────────────────┐   │
//!                        │  │ config │ observability │ lifecycle        │   │
//!                        │  └───────────────────────────────────────────┘   │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use dependency_health::checks::{Datastore, TcpDatastore};
use dependency_health::config::watcher::{self, ConfigWatcher};
use dependency_health::config;
use dependency_health::health::{DependencyRegistry, HealthAggregator};
use dependency_health::lifecycle::{signals, Shutdown};
use dependency_health::observability::{logging, metrics};
use dependency_health::HttpServer;

#[derive(Parser)]
#[command(name = "health-monitor")]
#[command(about = "Dependency health, readiness and liveness probes", long_about = None)]
struct Args {
    /// TOML configuration file; environment variables override its values.
    #[arg(short, long, env = "HEALTH_CONFIG")]
    config: Option<PathBuf>,

    /// Reload dependency declarations when the config file changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = config::load(args.config.as_deref())?;
    logging::init(&loaded.config.observability);
    loaded.log_warnings();
    let config = loaded.config;

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        environment = %config.service.environment,
        dependencies = config.dependencies.len(),
        "health-monitor starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry = Arc::new(DependencyRegistry::new(config.circuit_breaker.clone()));
    for dependency in config.dependency_configs() {
        if let Err(e) = registry.register(dependency) {
            tracing::warn!(error = %e, "Dependency skipped");
        }
    }

    let datastore = config.datastore.url.as_ref().map(|url| {
        tracing::info!(datastore = %config.datastore.name, address = %url, "Monitoring primary datastore");
        Arc::new(TcpDatastore::new(config.datastore.name.clone(), url.clone())) as Arc<dyn Datastore>
    });

    let aggregator = Arc::new(HealthAggregator::from_config(&config, registry.clone(), datastore));
    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    // The watcher handle must outlive the server.
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (config_watcher, updates) = ConfigWatcher::new(path, config.dependency_configs());
            let handle = config_watcher.run()?;
            tokio::spawn(watcher::apply_updates(registry.clone(), updates, shutdown.subscribe()));
            Some(handle)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for probes");

    let server = HttpServer::new(&config, aggregator);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
