//! Service host library: configuration with hot reload, ordered backing
//! store lifecycle, and a gracefully stopping HTTP server.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resources;

pub use config::{AppConfig, ConfigSource, ConfigStore};
pub use http::HttpServer;
pub use lifecycle::{Coordinator, Shutdown, ShutdownOutcome};
