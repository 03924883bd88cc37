//! Startup and shutdown orchestration.
//!
//! # Responsibilities
//! - Load configuration and install the first snapshot
//! - Open backing stores in declared order, rolling back on failure
//! - Start the config watcher, then bind the listener and the HTTP server
//! - Wait for termination, drain with a deadline, close stores in reverse
//!
//! # Design Decisions
//! - Fail fast: any error before serving is fatal
//! - Nothing after serving starts aborts teardown; errors are logged
//! - Listener binds last (traffic only when every store is up)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{AppConfig, ConfigError, ConfigSource, ConfigStore, ConfigWatcher};
use crate::http::server::{HttpServer, RunningServer, ServerError};
use crate::lifecycle::Shutdown;
use crate::resources::{Resource, ResourceError, ResourceSet};

/// Coordinator lifecycle states, in the only order they can occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unstarted,
    ConfigLoaded,
    ResourcesOpen,
    Serving,
    ShuttingDown,
    Stopped,
}

/// How the server drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every in-flight request finished before the deadline.
    Clean,
    /// The deadline passed with requests still running.
    TimedOut,
}

/// Fatal lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("configuration load failed: {0}")]
    Config(#[from] ConfigError),

    #[error("resource initialization failed: {0}")]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("cannot {action} while {state:?}")]
    InvalidState {
        action: &'static str,
        state: LifecycleState,
    },
}

/// Drives the service from configuration load to full stop.
pub struct Coordinator {
    source: ConfigSource,
    store: Arc<ConfigStore>,
    resources: ResourceSet,
    shutdown: Shutdown,
    state: LifecycleState,
}

impl Coordinator {
    pub fn new(source: ConfigSource, store: Arc<ConfigStore>) -> Self {
        Self {
            source,
            store,
            resources: ResourceSet::new(),
            shutdown: Shutdown::new(),
            state: LifecycleState::Unstarted,
        }
    }

    /// Declare a resource. Resources open in the order they are added.
    pub fn with_resource(mut self, resource: Arc<dyn Resource>) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    fn transition(&mut self, next: LifecycleState) {
        tracing::debug!(from = ?self.state, to = ?next, "Lifecycle transition");
        self.state = next;
    }

    fn require_state(
        &self,
        state: LifecycleState,
        action: &'static str,
    ) -> Result<(), LifecycleError> {
        if self.state == state {
            Ok(())
        } else {
            Err(LifecycleError::InvalidState {
                action,
                state: self.state,
            })
        }
    }

    fn snapshot(&self, action: &'static str) -> Result<Arc<AppConfig>, LifecycleError> {
        self.store.current().ok_or(LifecycleError::InvalidState {
            action,
            state: self.state,
        })
    }

    /// Load the configuration and install it as the first snapshot.
    pub fn load_config(&mut self) -> Result<Arc<AppConfig>, LifecycleError> {
        self.require_state(LifecycleState::Unstarted, "load configuration")?;

        let snapshot = match ConfigStore::load(&self.source) {
            Ok(config) => Arc::new(config),
            Err(e) => {
                tracing::error!(error = %e, "Configuration load failed");
                self.transition(LifecycleState::Stopped);
                return Err(e.into());
            }
        };
        self.store.replace(snapshot.clone());

        tracing::info!(
            name = %snapshot.app.name,
            version = %snapshot.app.version,
            mode = %snapshot.app.mode,
            port = snapshot.app.port,
            "Configuration loaded"
        );
        self.transition(LifecycleState::ConfigLoaded);
        Ok(snapshot)
    }

    /// Open every declared resource, all or nothing.
    pub async fn open_resources(&mut self) -> Result<(), LifecycleError> {
        self.require_state(LifecycleState::ConfigLoaded, "open resources")?;
        let snapshot = self.snapshot("open resources")?;

        if let Err(e) = self.resources.open_all(&snapshot).await {
            self.transition(LifecycleState::Stopped);
            return Err(e.into());
        }

        tracing::info!(
            resources = ?self.resources.names(),
            opened = self.resources.open_count(),
            "All resources open"
        );
        self.transition(LifecycleState::ResourcesOpen);
        Ok(())
    }

    /// Serve `router` until `signal` resolves, then shut everything down.
    ///
    /// A shutdown that overruns its deadline is reported as
    /// [`ShutdownOutcome::TimedOut`], not as an error.
    pub async fn serve<F>(
        &mut self,
        router: Router,
        signal: F,
    ) -> Result<ShutdownOutcome, LifecycleError>
    where
        F: Future<Output = ()>,
    {
        self.require_state(LifecycleState::ResourcesOpen, "serve")?;
        let snapshot = self.snapshot("serve")?;

        // The watcher is live before the listener accepts traffic.
        let watcher = match ConfigWatcher::new(self.source.clone(), self.store.clone())
            .start(self.shutdown.subscribe())
        {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Config watcher not started; hot reload disabled");
                None
            }
        };

        let mut running = match self.start_server(router, &snapshot).await {
            Ok(running) => running,
            Err(e) => {
                tracing::error!(error = %e, "Server start failed");
                self.shutdown.trigger();
                if let Some(watcher) = watcher {
                    watcher.stop().await;
                }
                self.resources.close_all().await;
                self.transition(LifecycleState::Stopped);
                return Err(e.into());
            }
        };

        self.transition(LifecycleState::Serving);
        let deadline = Duration::from_secs(snapshot.app.shutdown_timeout_secs);

        tokio::pin!(signal);
        let server_exit = tokio::select! {
            _ = &mut signal => None,
            result = running.exited() => Some(result),
        };

        self.transition(LifecycleState::ShuttingDown);
        tracing::info!(deadline_secs = deadline.as_secs(), "Shutting down server");

        let mut outcome = ShutdownOutcome::Clean;
        let failure = match server_exit {
            None => {
                match running.shutdown(deadline).await {
                    Ok(()) => {}
                    Err(ServerError::ShutdownTimeout(d)) => {
                        tracing::warn!(
                            deadline = ?d,
                            "Server shutdown timed out; abandoning in-flight requests"
                        );
                        outcome = ShutdownOutcome::TimedOut;
                    }
                    Err(e) => tracing::error!(error = %e, "Server shutdown failed"),
                }
                None
            }
            Some(result) => {
                let err = match result {
                    Ok(()) => {
                        ServerError::Serve(std::io::Error::other("server stopped unexpectedly"))
                    }
                    Err(e) => e,
                };
                tracing::error!(error = %err, "Server exited before shutdown was requested");
                Some(err)
            }
        };

        self.shutdown.trigger();
        if let Some(watcher) = watcher {
            watcher.stop().await;
        }

        let close_errors = self.resources.close_all().await;
        self.transition(LifecycleState::Stopped);
        tracing::info!(
            outcome = ?outcome,
            close_errors = close_errors.len(),
            "Shutdown complete"
        );

        match failure {
            Some(e) => Err(e.into()),
            None => Ok(outcome),
        }
    }

    async fn start_server(
        &self,
        router: Router,
        snapshot: &AppConfig,
    ) -> Result<RunningServer, ServerError> {
        let addr = snapshot.app.bind_address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        HttpServer::new(router).start(listener, &self.shutdown)
    }

    /// Run every phase in order.
    pub async fn run<F>(
        mut self,
        router: Router,
        signal: F,
    ) -> Result<ShutdownOutcome, LifecycleError>
    where
        F: Future<Output = ()>,
    {
        self.load_config()?;
        self.open_resources().await?;
        self.serve(router, signal).await
    }
}

/// Process exit status for a finished run.
///
/// Any completed shutdown exits 0, including one that overran its deadline;
/// every fatal error exits 1.
pub fn exit_status(result: &Result<ShutdownOutcome, LifecycleError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
