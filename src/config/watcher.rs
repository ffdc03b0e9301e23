//! Hot reload of dependency declarations.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that replace the file through a rename are still picked up. Each change
//! reloads the full config and forwards the dependency list only when it
//! differs from the last one sent. [`apply_updates`] reconciles the registry
//! from that stream.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::checks::DependencyConfig;
use crate::config::loader::load;
use crate::health::DependencyRegistry;
use crate::lifecycle::shutdown;

pub type DependencyUpdates = mpsc::UnboundedReceiver<Vec<DependencyConfig>>;

/// Watches one configuration file for dependency changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<Vec<DependencyConfig>>,
    current: Vec<DependencyConfig>,
}

impl ConfigWatcher {
    /// `current` is the dependency list already applied; an unchanged
    /// reload is not forwarded.
    pub fn new(path: &Path, current: Vec<DependencyConfig>) -> (Self, DependencyUpdates) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
                current,
            },
            update_rx,
        )
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            update_tx,
            mut current,
        } = self;
        let file_name = path.file_name().map(OsString::from);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let watched = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !touches(&event, file_name.as_deref()) {
                        return;
                    }
                    match load(Some(watched.as_path())) {
                        Ok(loaded) => {
                            loaded.log_warnings();
                            let dependencies = loaded.config.dependency_configs();
                            if dependencies != current {
                                tracing::info!(
                                    path = ?watched,
                                    dependencies = dependencies.len(),
                                    "Dependency declarations changed"
                                );
                                current = dependencies.clone();
                                let _ = update_tx.send(dependencies);
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current dependencies");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let relevant_kind = event.kind.is_modify() || event.kind.is_create();
    relevant_kind && event.paths.iter().any(|p| p.file_name() == file_name)
}

/// Reconcile `registry` with every update until the stream ends or
/// `shutdown` fires.
pub async fn apply_updates(
    registry: Arc<DependencyRegistry>,
    mut updates: DependencyUpdates,
    shutdown: broadcast::Receiver<()>,
) {
    tokio::select! {
        _ = async {
            while let Some(dependencies) = updates.recv().await {
                registry.reconcile(dependencies);
                tracing::info!(dependencies = registry.len(), "Registry reconciled");
            }
        } => {}
        _ = shutdown::wait(shutdown) => {}
    }
}
