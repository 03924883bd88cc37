//! Cache store (Redis) connection.
//!
//! The connection manager multiplexes commands over one connection and
//! reconnects on its own, so `pool_size` and `min_idle_conns` are only
//! reported, not enforced.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use url::Url;

use crate::config::{AppConfig, RedisConfig};
use crate::resources::{Resource, ResourceError};

const NAME: &str = "redis";

/// Redis connection handle.
#[derive(Default)]
pub struct RedisStore {
    conn: ArcSwapOption<ConnectionManager>,
}

impl RedisStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clone of the live connection, or `None` when the store is not open.
    pub fn connection(&self) -> Option<ConnectionManager> {
        self.conn.load().as_deref().cloned()
    }

    pub fn is_open(&self) -> bool {
        self.conn.load().is_some()
    }
}

/// Build `redis://[:password@]host:port/db` from the section.
pub fn connection_url(config: &RedisConfig) -> Result<Url, ResourceError> {
    let invalid = |reason: String| ResourceError::Config {
        resource: NAME,
        reason,
    };

    if config.host.trim().is_empty() {
        return Err(invalid("redis.host must not be empty".into()));
    }
    if config.db < 0 {
        return Err(invalid(format!("redis.db {} is negative", config.db)));
    }

    let mut url = Url::parse(&format!(
        "redis://{}:{}/{}",
        config.host, config.port, config.db
    ))
    .map_err(|e| invalid(format!("redis.host '{}': {}", config.host, e)))?;

    if !config.password.is_empty() {
        url.set_password(Some(&config.password))
            .map_err(|_| invalid("redis.password cannot be encoded".into()))?;
    }

    Ok(url)
}

#[async_trait]
impl Resource for RedisStore {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn open(&self, config: &AppConfig) -> Result<(), ResourceError> {
        if self.is_open() {
            tracing::debug!("Redis connection already open");
            return Ok(());
        }

        let section = &config.redis;
        if section.connect_timeout_secs == 0 {
            return Err(ResourceError::Config {
                resource: NAME,
                reason: "redis.connect_timeout_secs must be greater than zero".into(),
            });
        }
        let url = connection_url(section)?;
        let client = redis::Client::open(url.as_str()).map_err(|e| ResourceError::Config {
            resource: NAME,
            reason: e.to_string(),
        })?;

        let addr = format!("{}:{}/{}", section.host, section.port, section.db);
        let timeout = Duration::from_secs(section.connect_timeout_secs);
        let unavailable = |reason: String| ResourceError::Unavailable {
            resource: NAME,
            reason: format!("{}: {}", addr, reason),
        };

        let connect = async {
            let mut conn = ConnectionManager::new(client).await?;
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>((conn, pong))
        };

        let (conn, pong) = tokio::time::timeout(timeout, connect)
            .await
            .map_err(|_| {
                unavailable(format!(
                    "no connection within {}s",
                    section.connect_timeout_secs
                ))
            })?
            .map_err(|e| unavailable(e.to_string()))?;

        if pong != "PONG" {
            return Err(unavailable(format!("unexpected PING reply '{}'", pong)));
        }

        tracing::info!(
            addr = %addr,
            pool_size = section.pool_size,
            min_idle_conns = section.min_idle_conns,
            "Redis connected"
        );

        self.conn.store(Some(Arc::new(conn)));
        Ok(())
    }

    async fn close(&self) -> Result<(), ResourceError> {
        // Dropping the last manager clone closes the socket.
        drop(self.conn.swap(None));
        Ok(())
    }
}
