//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML/YAML)
//!     → loader.rs (locate, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → store.rs (installed as the current Arc<AppConfig>)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap in store.rs
//!     → readers pick up the new snapshot on their next read
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - A failed reload keeps the previous snapshot
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use loader::{ConfigError, ConfigSource};
pub use schema::{AppConfig, AppSection, LogConfig, MySqlConfig, RedisConfig};
pub use store::ConfigStore;
pub use watcher::{ConfigWatcher, WatcherHandle};
