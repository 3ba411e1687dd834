//! Document watcher for hot reload.
//!
//! # Responsibilities
//! - Reload on write/create notifications
//! - On rename/remove, wait out a cooldown, re-register the watch on the
//!   same path, then reload
//! - Publish each successfully built snapshot atomically
//!
//! # Design Decisions
//! - A failed reload is logged and the previous snapshot stays live
//! - Reading and building run on the blocking pool; reloads never overlap
//! - Listener settings (host, port, tls, metrics) only change on restart
//! - The watch loop ends on the shutdown broadcast

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use crate::config::loader::{load_document, ConfigError};
use crate::observability::metrics;
use crate::snapshot::{Snapshot, SnapshotHandle};

/// Wait after a rename/remove before re-watching the path.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Reload,
    Rewatch,
    Ignore,
}

fn classify(kind: &EventKind) -> Action {
    match kind {
        EventKind::Modify(ModifyKind::Name(_)) | EventKind::Remove(_) => Action::Rewatch,
        EventKind::Modify(_) | EventKind::Create(_) => Action::Reload,
        _ => Action::Ignore,
    }
}

/// Watches the backing document and keeps the snapshot handle current.
#[derive(Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    handle: SnapshotHandle,
    cooldown: Duration,
}

impl ConfigWatcher {
    pub fn new(path: &Path, handle: SnapshotHandle) -> Self {
        Self {
            path: path.to_path_buf(),
            handle,
            cooldown: DEFAULT_COOLDOWN,
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Load, build and publish the document; true when a snapshot was
    /// published. On error nothing is published.
    ///
    /// An empty file is an editor mid-save (truncate, then write) and is
    /// skipped.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        if std::fs::metadata(&self.path).is_ok_and(|m| m.len() == 0) {
            tracing::debug!(path = ?self.path, "Config file is empty; skipping reload");
            return Ok(false);
        }
        let doc = load_document(&self.path)?;
        let snapshot = Snapshot::build(doc)?;

        let previous = self.handle.publish(snapshot);
        let current = self.handle.load();
        let changed = current.listener_changes(&previous);
        if !changed.is_empty() {
            tracing::warn!(
                settings = ?changed,
                "Listener settings changed; they take effect on restart"
            );
        }
        tracing::info!(
            path = ?self.path,
            routes = current.routes.len(),
            "Configuration reloaded"
        );
        Ok(true)
    }

    fn reload_logged(&self) {
        match self.reload() {
            Ok(true) => metrics::record_reload(true),
            Ok(false) => {}
            Err(e) => {
                metrics::record_reload(false);
                tracing::error!(
                    path = ?self.path,
                    error = %e,
                    "Failed to reload configuration. Keeping current configuration."
                );
            }
        }
    }

    /// [`Self::reload`] on the blocking pool, logged and counted.
    async fn reload_blocking(&self) {
        let watcher = self.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || watcher.reload_logged()).await {
            tracing::error!(error = %e, "Reload task failed");
        }
    }

    /// Start watching in a background task that runs until `shutdown` fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> Result<JoinHandle<()>, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?self.path, "Config watcher started");

        Ok(tokio::spawn(async move {
            let mut deadline: Option<Instant> = None;
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    received = rx.recv() => {
                        let Some(res) = received else { break };
                        match res {
                            Ok(event) => match classify(&event.kind) {
                                Action::Reload => {
                                    tracing::info!("Config file change detected, reloading...");
                                    self.reload_blocking().await;
                                }
                                Action::Rewatch => {
                                    tracing::debug!(kind = ?event.kind, "Config file moved or removed");
                                    deadline = Some(Instant::now() + self.cooldown);
                                }
                                Action::Ignore => {}
                            },
                            Err(e) => tracing::error!(error = ?e, "Watch error"),
                        }
                    }
                    _ = cooldown(deadline) => {
                        deadline = None;
                        if !self.path.exists() {
                            tracing::warn!(path = ?self.path, "Config file missing; waiting");
                            deadline = Some(Instant::now() + self.cooldown);
                            continue;
                        }
                        let _ = watcher.unwatch(&self.path);
                        if let Err(e) = watcher.watch(&self.path, RecursiveMode::NonRecursive) {
                            tracing::error!(path = ?self.path, error = ?e, "Failed to re-watch config file");
                            deadline = Some(Instant::now() + self.cooldown);
                            continue;
                        }
                        self.reload_blocking().await;
                    }
                }
            }
            tracing::info!("Config watcher stopped");
        }))
    }
}

async fn cooldown(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind, RenameMode};

    #[test]
    fn test_classify_events() {
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Action::Reload
        );
        assert_eq!(classify(&EventKind::Create(CreateKind::File)), Action::Reload);
        assert_eq!(
            classify(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
            Action::Rewatch
        );
        assert_eq!(classify(&EventKind::Remove(RemoveKind::File)), Action::Rewatch);
        assert_eq!(classify(&EventKind::Any), Action::Ignore);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.yaml");
        std::fs::write(&path, "port: 1000\n").unwrap();

        let handle = SnapshotHandle::new(Snapshot::build(load_document(&path).unwrap()).unwrap());
        let watcher = ConfigWatcher::new(&path, handle.clone());

        std::fs::write(&path, "port: [not a port\n").unwrap();
        assert!(watcher.reload().is_err());
        assert_eq!(handle.load().port, 1000);

        std::fs::write(&path, "").unwrap();
        assert!(!watcher.reload().unwrap());
        assert_eq!(handle.load().port, 1000);

        std::fs::write(&path, "port: 2000\n").unwrap();
        assert!(watcher.reload().unwrap());
        assert_eq!(handle.load().port, 2000);
    }

    #[tokio::test]
    async fn test_reload_runs_on_blocking_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.yaml");
        std::fs::write(&path, "port: 1000\n").unwrap();

        let handle = SnapshotHandle::new(Snapshot::build(load_document(&path).unwrap()).unwrap());
        let watcher = ConfigWatcher::new(&path, handle.clone());

        std::fs::write(&path, "port: 3000\n").unwrap();
        watcher.reload_blocking().await;
        assert_eq!(handle.load().port, 3000);

        std::fs::write(&path, "port: [broken\n").unwrap();
        watcher.reload_blocking().await;
        assert_eq!(handle.load().port, 3000);
    }
}
