//! Backing store lifecycle.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ResourceSet::open_all (declared order)
//!         → database.rs (MySQL pool)
//!         → cache.rs (Redis connection)
//!     first failure → close already-opened in reverse → abort
//!
//! Shutdown:
//!     ResourceSet::close_all (reverse order, errors logged)
//! ```
//!
//! # Design Decisions
//! - Handles are shared as `Arc` with the request layer; only the
//!   coordinator opens and closes them
//! - Resources read their section once at open; reloads do not reconnect

pub mod cache;
pub mod database;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::AppConfig;

pub use cache::RedisStore;
pub use database::MySqlStore;

/// Errors raised by a backing store handle.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The resource's configuration section is missing or invalid.
    #[error("{resource}: invalid configuration: {reason}")]
    Config {
        resource: &'static str,
        reason: String,
    },

    /// The store could not be reached within its connect timeout.
    #[error("{resource}: unavailable: {reason}")]
    Unavailable {
        resource: &'static str,
        reason: String,
    },

    #[error("{resource}: close failed: {reason}")]
    Close {
        resource: &'static str,
        reason: String,
    },
}

/// A backing store the service depends on.
///
/// `open` must leave the handle released when it fails. `close` is
/// idempotent and never drains in-flight work.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    async fn open(&self, config: &AppConfig) -> Result<(), ResourceError>;

    async fn close(&self) -> Result<(), ResourceError>;
}

/// Resources in their declared order, with open/close sequencing.
#[derive(Default)]
pub struct ResourceSet {
    resources: Vec<Arc<dyn Resource>>,
    /// Length of the prefix of `resources` currently open.
    opened: usize,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a resource to the declared order.
    pub fn push(&mut self, resource: Arc<dyn Resource>) {
        self.resources.push(resource);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.resources.iter().map(|r| r.name()).collect()
    }

    /// Number of resources currently open.
    pub fn open_count(&self) -> usize {
        self.opened
    }

    /// Open every resource in declared order.
    ///
    /// On the first failure the resources opened so far are closed in
    /// reverse order and the error is returned; later resources are never
    /// touched.
    pub async fn open_all(&mut self, config: &AppConfig) -> Result<(), ResourceError> {
        while self.opened < self.resources.len() {
            let resource = self.resources[self.opened].clone();
            let start = Instant::now();
            tracing::info!(resource = resource.name(), "Opening resource");

            match resource.open(config).await {
                Ok(()) => {
                    self.opened += 1;
                    tracing::info!(
                        resource = resource.name(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Resource opened"
                    );
                }
                Err(e) => {
                    tracing::error!(resource = resource.name(), error = %e, "Resource open failed");
                    self.close_all().await;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Close every open resource in reverse declared order.
    ///
    /// Errors are logged and collected; they never stop the remaining
    /// closes.
    pub async fn close_all(&mut self) -> Vec<ResourceError> {
        let mut errors = Vec::new();
        while self.opened > 0 {
            self.opened -= 1;
            let resource = &self.resources[self.opened];
            match resource.close().await {
                Ok(()) => tracing::info!(resource = resource.name(), "Resource closed"),
                Err(e) => {
                    tracing::warn!(resource = resource.name(), error = %e, "Resource close failed");
                    errors.push(e);
                }
            }
        }
        errors
    }
}
