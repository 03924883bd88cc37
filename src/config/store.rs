//! Current configuration snapshot holder.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::loader::{load_config, ConfigError, ConfigSource};
use crate::config::schema::AppConfig;

/// Holds the current configuration snapshot.
///
/// Reads are lock-free and never observe a half-installed snapshot: a reload
/// swaps the whole `Arc<AppConfig>` in one step. Callers that already hold a
/// snapshot keep seeing its values after a replacement.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: ArcSwapOption<AppConfig>,
}

impl ConfigStore {
    /// Create an empty store. Nothing is current until the first
    /// [`replace`](Self::replace).
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Parse the source into a fully populated snapshot.
    ///
    /// This does not touch any store; installing the result is a separate
    /// [`replace`](Self::replace).
    pub fn load(source: &ConfigSource) -> Result<AppConfig, ConfigError> {
        load_config(source)
    }

    /// The latest installed snapshot, or `None` before the first install.
    pub fn current(&self) -> Option<Arc<AppConfig>> {
        self.current.load_full()
    }

    /// Install `snapshot` as current, returning the one it replaced.
    pub fn replace(&self, snapshot: Arc<AppConfig>) -> Option<Arc<AppConfig>> {
        self.current.swap(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(port: u16) -> Arc<AppConfig> {
        let raw = format!(
            r#"
            [app]
            name = "svc"
            port = {port}
            [mysql]
            host = "db"
            user = "root"
            dbname = "app"
            [redis]
            host = "cache"
            "#
        );
        Arc::new(toml::from_str(&raw).unwrap())
    }

    #[test]
    fn test_starts_empty() {
        assert!(ConfigStore::new().current().is_none());
    }

    #[test]
    fn test_replace_keeps_old_readers_stable() {
        let store = ConfigStore::new();
        assert!(store.replace(snapshot(8080)).is_none());

        let held = store.current().unwrap();
        let previous = store.replace(snapshot(9090)).unwrap();

        assert!(Arc::ptr_eq(&held, &previous));
        assert_eq!(held.app.port, 8080);
        assert_eq!(store.current().unwrap().app.port, 9090);
    }

    #[test]
    fn test_concurrent_readers_see_whole_snapshots() {
        let store = Arc::new(ConfigStore::new());
        store.replace(snapshot(1000));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let config = store.current().unwrap();
                        let port = config.app.port;
                        assert!(port == 1000 || port == 2000);
                        assert_eq!(config.app.bind_address(), format!("0.0.0.0:{port}"));
                    }
                })
            })
            .collect();

        for _ in 0..100 {
            store.replace(snapshot(2000));
            store.replace(snapshot(1000));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }
}
