//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ports, pool sizes, timeouts)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the store

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a decoded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    /// Dotted key path, e.g. `mysql.max_idle`.
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Check a decoded configuration for values serde cannot reject on its own.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.app.name.trim().is_empty() {
        errors.push(ValidationError::new("app.name", "must not be empty"));
    }
    if config.app.port == 0 {
        errors.push(ValidationError::new("app.port", "must be non-zero"));
    }
    if config.app.host.trim().is_empty() {
        errors.push(ValidationError::new("app.host", "must not be empty"));
    }
    if config.app.shutdown_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "app.shutdown_timeout_secs",
            "must be greater than zero",
        ));
    }

    if config.log.level.trim().is_empty() {
        errors.push(ValidationError::new("log.level", "must not be empty"));
    }

    if config.mysql.max_open == 0 {
        errors.push(ValidationError::new("mysql.max_open", "must be at least 1"));
    }
    if config.mysql.max_idle > config.mysql.max_open {
        errors.push(ValidationError::new(
            "mysql.max_idle",
            format!(
                "{} exceeds mysql.max_open ({})",
                config.mysql.max_idle, config.mysql.max_open
            ),
        ));
    }

    if config.redis.db < 0 {
        errors.push(ValidationError::new("redis.db", "must not be negative"));
    }
    if config.redis.pool_size == 0 {
        errors.push(ValidationError::new("redis.pool_size", "must be at least 1"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        toml::from_str(
            r#"
            [app]
            name = "svc"
            port = 8080
            [mysql]
            host = "db"
            user = "root"
            dbname = "app"
            [redis]
            host = "cache"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.app.port = 0;
        config.mysql.max_open = 5;
        config.mysql.max_idle = 6;
        config.redis.db = -1;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["app.port", "mysql.max_idle", "redis.db"]);
    }
}
