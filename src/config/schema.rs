//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! Sections that carry required keys (`app`, `mysql`, `redis`) fail to decode
//! when those keys are missing; every other field falls back to a default.

use serde::Deserialize;

/// Root configuration snapshot.
///
/// A snapshot is never mutated after it has been installed in the
/// [`ConfigStore`](crate::config::ConfigStore); reloads swap in a new one.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppConfig {
    /// Application identity and listener settings.
    pub app: AppSection,

    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Relational store connection parameters.
    pub mysql: MySqlConfig,

    /// Cache store connection parameters.
    pub redis: RedisConfig,
}

/// Application identity and listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSection {
    /// Service name, used in log output.
    pub name: String,

    /// Listener port.
    pub port: u16,

    /// Listener bind host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Run mode, `dev` or `release`.
    #[serde(default = "default_mode")]
    pub mode: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Free-form start date, e.g. used as an id generator epoch.
    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default = "default_machine_id")]
    pub machine_id: u16,

    /// Maximum time to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl AppSection {
    /// `host:port` string the listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_dev(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dev")
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_mode() -> String {
    "release".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_machine_id() -> u16 {
    1
}

fn default_shutdown_timeout_secs() -> u64 {
    5
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub level: String,

    /// Log file path. Logs go to stdout when unset.
    pub filename: Option<String>,

    /// Number of rotated log files to keep.
    pub max_backups: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            filename: None,
            max_backups: 7,
        }
    }
}

/// MySQL connection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MySqlConfig {
    pub host: String,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database (schema) name.
    pub dbname: String,

    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Maximum open connections in the pool.
    #[serde(default = "default_max_open")]
    pub max_open: u32,

    /// Idle connections kept warm in the pool.
    #[serde(default = "default_max_idle")]
    pub max_idle: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_max_open() -> u32 {
    100
}

fn default_max_idle() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    5
}

/// Redis connection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedisConfig {
    pub host: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    /// Logical database index.
    #[serde(default)]
    pub db: i64,

    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default)]
    pub min_idle_conns: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_redis_port() -> u16 {
    6379
}

fn default_pool_size() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let raw = r#"
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

        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.app.host, "0.0.0.0");
        assert_eq!(config.app.mode, "release");
        assert_eq!(config.app.shutdown_timeout_secs, 5);
        assert_eq!(config.log, LogConfig::default());
        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.mysql.max_open, 100);
        assert_eq!(config.mysql.max_idle, 10);
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.redis.db, 0);
        assert_eq!(config.app.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_required_key_fails() {
        let raw = r#"
            [app]
            name = "svc"

            [mysql]
            host = "db"
            user = "root"
            dbname = "app"

            [redis]
            host = "cache"
        "#;

        let err = toml::from_str::<AppConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let raw = r#"
            [app]
            name = "svc"
            port = 8080
            flavour = "vanilla"

            [mysql]
            host = "db"
            user = "root"
            dbname = "app"

            [redis]
            host = "cache"

            [extra]
            anything = true
        "#;

        assert!(toml::from_str::<AppConfig>(raw).is_ok());
    }

    #[test]
    fn test_log_section_accepts_legacy_rotation_keys() {
        let raw = r#"
            [app]
            name = "svc"
            port = 8080

            [log]
            level = "debug"
            max_size = 200
            max_age = 30
            max_backups = 3

            [mysql]
            host = "db"
            user = "root"
            dbname = "app"

            [redis]
            host = "cache"
        "#;

        let config: AppConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.max_backups, 3);
        assert_eq!(config.log.filename, None);
    }
}
