//! Configuration loading from disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File extensions probed during a search, in priority order.
const EXTENSIONS: &[&str] = &["toml", "yaml", "yml"];

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No candidate file exists in any search directory.
    #[error("config file '{}' not found in {}", .name, DisplayPaths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config format for {}", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {}", DisplayErrors(.0))]
    Validation(Vec<ValidationError>),
}

impl ConfigError {
    /// True when the source itself could not be located or read, as opposed
    /// to being readable but malformed.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            ConfigError::NotFound { .. }
                | ConfigError::Io { .. }
                | ConfigError::UnsupportedFormat { .. }
        )
    }
}

struct DisplayPaths<'a>(&'a [PathBuf]);

impl fmt::Display for DisplayPaths<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, path) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path.display())?;
        }
        write!(f, "]")
    }
}

struct DisplayErrors<'a>(&'a [ValidationError]);

impl fmt::Display for DisplayErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Where the configuration comes from.
///
/// Either an explicit file, or a base name looked up across an ordered list
/// of directories with each supported extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    file: Option<PathBuf>,
    name: String,
    search_paths: Vec<PathBuf>,
}

impl ConfigSource {
    /// Use exactly this file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    /// Look up `name.{toml,yaml,yml}` in each directory, first match wins.
    pub fn search<I, P>(name: impl Into<String>, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            file: None,
            name: name.into(),
            search_paths: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Find the file this source currently points at.
    pub fn resolve(&self) -> Result<PathBuf, ConfigError> {
        if let Some(file) = &self.file {
            return Ok(file.clone());
        }

        let mut searched = Vec::new();
        for dir in &self.search_paths {
            for ext in EXTENSIONS {
                let candidate = dir.join(format!("{}.{}", self.name, ext));
                if candidate.is_file() {
                    return Ok(candidate);
                }
                searched.push(candidate);
            }
        }

        Err(ConfigError::NotFound {
            name: self.name.clone(),
            searched,
        })
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self {
            file: None,
            name: "config".to_string(),
            search_paths: vec![PathBuf::from(".")],
        }
    }
}

/// Resolve, read, decode and validate a configuration source.
pub fn load_config(source: &ConfigSource) -> Result<AppConfig, ConfigError> {
    let path = source.resolve()?;
    load_config_file(&path)
}

/// Read, decode and validate one configuration file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = decode(path, &content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn decode(path: &Path, content: &str) -> Result<AppConfig, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match ext.as_deref() {
        Some("toml") => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))
        }
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
