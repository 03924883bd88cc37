//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::loader::{ConfigError, ConfigSource};
use crate::config::schema::AppConfig;
use crate::config::store::ConfigStore;

/// Quiet period after a change event before reloading.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Error type for starting the watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot resolve config file to watch: {0}")]
    Resolve(#[from] ConfigError),

    #[error("config file {} has no parent directory", .0.display())]
    NoParent(PathBuf),

    #[error("file watch failed: {0}")]
    Notify(#[from] notify::Error),
}

/// Load the source and install the result in `store`.
///
/// On failure the store is left untouched and the error returned.
pub fn apply_reload(
    source: &ConfigSource,
    store: &ConfigStore,
) -> Result<Arc<AppConfig>, ConfigError> {
    let snapshot = Arc::new(ConfigStore::load(source)?);
    store.replace(snapshot.clone());
    Ok(snapshot)
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    source: ConfigSource,
    store: Arc<ConfigStore>,
    debounce: Duration,
}

impl ConfigWatcher {
    pub fn new(source: ConfigSource, store: Arc<ConfigStore>) -> Self {
        Self {
            source,
            store,
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Override the quiet period used to coalesce bursts of events.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching the file and spawn the reload task.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors replacing the file through a rename are still observed.
    /// Reloading stops when `shutdown` fires or the handle is dropped.
    pub fn start(self, shutdown: broadcast::Receiver<()>) -> Result<WatcherHandle, WatchError> {
        let path = self.source.resolve()?;
        let dir = match path.parent() {
            Some(p) if p.as_os_str().is_empty() => PathBuf::from("."),
            Some(p) => p.to_path_buf(),
            None => return Err(WatchError::NoParent(path)),
        };
        let file_name = path.file_name().map(|n| n.to_os_string());

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let relevant = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == file_name.as_deref());
                    if relevant {
                        tracing::debug!(kind = ?event.kind, "Config file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");

        let task = tokio::spawn(reload_loop(
            rx,
            shutdown,
            ConfigSource::file(&path),
            self.store,
            self.debounce,
        ));

        Ok(WatcherHandle {
            _watcher: watcher,
            path,
            task,
        })
    }
}

/// Keeps the file watch alive. Dropping it stops observation.
pub struct WatcherHandle {
    _watcher: RecommendedWatcher,
    path: PathBuf,
    task: JoinHandle<usize>,
}

impl WatcherHandle {
    /// The file being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop watching and wait for the reload task to exit.
    pub async fn stop(self) {
        let WatcherHandle {
            _watcher: watcher,
            task,
            ..
        } = self;
        drop(watcher);
        task.abort();
        match task.await {
            Ok(reloads) => tracing::debug!(reloads, "Config watcher stopped"),
            Err(_) => tracing::debug!("Config watcher stopped"),
        }
    }
}

/// Applies reloads one at a time, in the order changes were detected.
///
/// Returns the number of reloads attempted once the event stream closes or
/// shutdown fires.
async fn reload_loop(
    mut events: mpsc::UnboundedReceiver<()>,
    mut shutdown: broadcast::Receiver<()>,
    source: ConfigSource,
    store: Arc<ConfigStore>,
    debounce: Duration,
) -> usize {
    let mut reloads = 0usize;
    loop {
        tokio::select! {
            event = events.recv() => {
                if event.is_none() {
                    break;
                }
            }
            _ = shutdown.recv() => {
                tracing::debug!("Config watcher received shutdown signal");
                break;
            }
        }

        // Coalesce the burst of events a single save usually produces.
        tokio::time::sleep(debounce).await;
        let mut coalesced = 0usize;
        while events.try_recv().is_ok() {
            coalesced += 1;
        }

        reloads += 1;
        let previous = store.current();
        match apply_reload(&source, &store) {
            Ok(snapshot) => {
                let changed = previous.as_deref() != Some(snapshot.as_ref());
                tracing::info!(
                    changed,
                    coalesced,
                    port = snapshot.app.port,
                    "Configuration reloaded"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to reload config. Keeping current configuration."
                );
            }
        }
    }
    reloads
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = r#"
[app]
name = "svc"
port = 8080

[mysql]
host = "db"
user = "root"
dbname = "app"

[redis]
host = "cache"
"#;

    #[test]
    fn test_apply_reload_installs_new_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, VALID).unwrap();

        let store = ConfigStore::new();
        let source = ConfigSource::file(&path);
        apply_reload(&source, &store).unwrap();
        assert_eq!(store.current().unwrap().app.port, 8080);

        fs::write(&path, VALID.replace("8080", "8090")).unwrap();
        apply_reload(&source, &store).unwrap();
        assert_eq!(store.current().unwrap().app.port, 8090);
    }

    #[test]
    fn test_failed_reload_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, VALID).unwrap();

        let store = ConfigStore::new();
        let source = ConfigSource::file(&path);
        apply_reload(&source, &store).unwrap();
        let before = store.current().unwrap();

        fs::write(&path, "[app\nport = ").unwrap();
        let err = apply_reload(&source, &store).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));

        let after = store.current().unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_start_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ConfigStore::new());
        let (tx, _) = broadcast::channel(1);

        let watcher = ConfigWatcher::new(ConfigSource::search("config", [dir.path()]), store);
        let err = watcher.start(tx.subscribe()).err().unwrap();
        assert!(matches!(err, WatchError::Resolve(_)));
    }

    #[tokio::test]
    async fn test_queued_changes_coalesce_into_one_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, VALID).unwrap();

        let store = Arc::new(ConfigStore::new());
        let source = ConfigSource::file(&path);
        apply_reload(&source, &store).unwrap();
        let before = store.current().unwrap();

        fs::write(&path, VALID.replace("8080", "8095")).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        for _ in 0..5 {
            tx.send(()).unwrap();
        }
        drop(tx);

        let (_stop, stop_rx) = broadcast::channel(1);
        let debounce = Duration::from_millis(10);
        let reloads = reload_loop(rx, stop_rx, source, store.clone(), debounce).await;

        assert_eq!(reloads, 1);
        let after = store.current().unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.app.port, 8095);
    }
}
