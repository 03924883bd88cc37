//! Relational store (MySQL) connection pool.
//!
//! # Responsibilities
//! - Build connection options from the `mysql` section
//! - Establish the pool within the configured connect timeout
//! - Hand out pool clones to request handlers
//! - Release the pool on close

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use crate::config::{AppConfig, MySqlConfig};
use crate::resources::{Resource, ResourceError};

const NAME: &str = "mysql";

/// MySQL pool handle.
#[derive(Default)]
pub struct MySqlStore {
    pool: ArcSwapOption<MySqlPool>,
}

impl MySqlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live pool, or `None` when the store is not open.
    pub fn pool(&self) -> Option<MySqlPool> {
        self.pool.load().as_deref().cloned()
    }

    pub fn is_open(&self) -> bool {
        self.pool.load().is_some()
    }
}

/// `user@host:port/dbname`, without the password.
pub fn describe(config: &MySqlConfig) -> String {
    format!(
        "{}@{}:{}/{}",
        config.user, config.host, config.port, config.dbname
    )
}

fn connect_options(config: &MySqlConfig) -> Result<MySqlConnectOptions, ResourceError> {
    let missing = [
        ("host", config.host.as_str()),
        ("user", config.user.as_str()),
        ("dbname", config.dbname.as_str()),
    ]
    .into_iter()
    .find(|(_, value)| value.trim().is_empty());

    if let Some((field, _)) = missing {
        return Err(ResourceError::Config {
            resource: NAME,
            reason: format!("mysql.{field} must not be empty"),
        });
    }
    if config.connect_timeout_secs == 0 {
        return Err(ResourceError::Config {
            resource: NAME,
            reason: "mysql.connect_timeout_secs must be greater than zero".into(),
        });
    }

    Ok(MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.dbname)
        .charset("utf8"))
}

#[async_trait]
impl Resource for MySqlStore {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn open(&self, config: &AppConfig) -> Result<(), ResourceError> {
        if self.is_open() {
            tracing::debug!("MySQL pool already open");
            return Ok(());
        }

        let section = &config.mysql;
        let options = connect_options(section)?;
        let timeout = Duration::from_secs(section.connect_timeout_secs);

        let connect = MySqlPoolOptions::new()
            .max_connections(section.max_open)
            .min_connections(section.max_idle)
            .acquire_timeout(timeout)
            .connect_with(options);

        // A timed-out connect drops the half-built pool with the future.
        let pool = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| ResourceError::Unavailable {
                resource: NAME,
                reason: format!(
                    "no connection to {} within {}s",
                    describe(section),
                    section.connect_timeout_secs
                ),
            })?
            .map_err(|e| ResourceError::Unavailable {
                resource: NAME,
                reason: format!("{}: {}", describe(section), e),
            })?;

        tracing::info!(
            target_db = %describe(section),
            max_open = section.max_open,
            max_idle = section.max_idle,
            "MySQL pool connected"
        );

        self.pool.store(Some(Arc::new(pool)));
        Ok(())
    }

    async fn close(&self) -> Result<(), ResourceError> {
        if let Some(pool) = self.pool.swap(None) {
            pool.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(host: &str, port: u16) -> AppConfig {
        toml::from_str(&format!(
            r#"
            [app]
            name = "svc"
            port = 8080
            [mysql]
            host = "{host}"
            port = {port}
            user = "root"
            dbname = "app"
            connect_timeout_secs = 1
            [redis]
            host = "cache"
            "#
        ))
        .unwrap()
    }

    #[test]
    fn test_describe_omits_password() {
        let mut cfg = config("db", 3306).mysql;
        cfg.password = "hunter2".into();
        assert_eq!(describe(&cfg), "root@db:3306/app");
    }

    #[tokio::test]
    async fn test_empty_host_is_config_error() {
        let store = MySqlStore::new();
        let err = store.open(&config("", 3306)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Config { resource: "mysql", .. }));
        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable() {
        // Bind then drop a listener to get a port nothing is listening on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let store = MySqlStore::new();
        let err = store.open(&config("127.0.0.1", port)).await.unwrap_err();
        assert!(matches!(err, ResourceError::Unavailable { resource: "mysql", .. }));
        assert!(store.pool().is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let store = MySqlStore::new();
        store.close().await.unwrap();
        store.close().await.unwrap();
    }
}
