//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber from the `log` section
//! - Route output to stdout or a rolling log file
//!
//! # Design Decisions
//! - JSON format for release, human-readable format for dev
//! - `RUST_LOG` overrides `log.level` when set
//! - File output rotates daily and keeps `log.max_backups` files

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Error type for logging setup.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{directive}': {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("cannot create log directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot open log file: {0}")]
    Appender(String),

    #[error("failed to install subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Keeps the background file writer alive. Hold it until exit so
/// buffered lines are flushed.
#[must_use]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Build the level filter, preferring an explicit override directive.
pub fn build_filter(
    level: &str,
    env_override: Option<&str>,
) -> Result<EnvFilter, LoggingError> {
    let directive = env_override.unwrap_or(level);
    EnvFilter::try_new(directive).map_err(|source| LoggingError::Filter {
        directive: directive.to_string(),
        source,
    })
}

/// Install the global subscriber.
pub fn init(config: &LogConfig, dev: bool) -> Result<LogGuard, LoggingError> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.level, env.as_deref())?;

    let (writer, guard) = match &config.filename {
        Some(file) => {
            let appender = file_appender(config, file)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if dev {
        registry
            .with(fmt::layer().with_writer(writer).with_ansi(config.filename.is_none()))
            .try_init()?;
    } else {
        registry.with(fmt::layer().json().with_writer(writer)).try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        filename = ?config.filename,
        max_backups = config.max_backups,
        "Logging initialized"
    );

    Ok(LogGuard { _file: guard })
}

/// Daily-rolling appender for `file`, creating its directory if needed.
pub fn file_appender(
    config: &LogConfig,
    file: &str,
) -> Result<RollingFileAppender, LoggingError> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("service.log");

    std::fs::create_dir_all(dir).map_err(|source| LoggingError::Directory {
        path: dir.to_path_buf(),
        source,
    })?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(config.max_backups.max(1))
        .build(dir)
        .map_err(|e| LoggingError::Appender(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_filter_prefers_override() {
        assert!(build_filter("info", None).is_ok());
        assert!(build_filter("info", Some("service_host=trace")).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let err = build_filter("service_host=loud", None).unwrap_err();
        assert!(matches!(err, LoggingError::Filter { .. }));
    }

    #[test]
    fn test_file_appender_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("logs").join("app.log");
        let config = LogConfig {
            filename: Some(file.to_string_lossy().into_owned()),
            ..LogConfig::default()
        };

        let mut appender = file_appender(&config, config.filename.as_deref().unwrap()).unwrap();
        appender.write_all(b"hello\n").unwrap();
        appender.flush().unwrap();

        let written: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(written.len(), 1);
    }
}
