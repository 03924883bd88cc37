//! HTTP server setup and bounded shutdown.
//!
//! # Responsibilities
//! - Wire up middleware (tracing, request ID, panic recovery)
//! - Run the accept/dispatch loop on its own task
//! - Stop accepting on shutdown and drain in-flight requests up to a deadline

use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::request::{request_id_of, UuidRequestId};
use crate::lifecycle::Shutdown;

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server loop failed: {0}")]
    Serve(#[from] std::io::Error),

    /// In-flight requests were still running when the deadline passed.
    #[error("shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("server task panicked")]
    Panicked,
}

/// HTTP server wrapping the request-processing router.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Wrap `router` with the standard middleware stack.
    pub fn new(router: Router) -> Self {
        Self {
            router: Self::build_router(router),
        }
    }

    fn build_router(router: Router) -> Router {
        // Outermost first: the request ID is assigned before the trace span
        // opens, and panics are caught inside the layer that echoes the ID.
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id_of(request),
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CatchPanicLayer::new());

        router.layer(middleware)
    }

    /// Start serving on `listener` in a background task.
    ///
    /// The loop stops accepting as soon as `shutdown` is triggered.
    pub fn start(
        self,
        listener: TcpListener,
        shutdown: &Shutdown,
    ) -> Result<RunningServer, ServerError> {
        let addr = listener.local_addr()?;
        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!(address = %addr, "HTTP server starting");

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = stop.recv().await;
                    tracing::info!("HTTP server draining connections");
                })
                .await
        });

        Ok(RunningServer {
            addr,
            task: Some(task),
            shutdown: shutdown.clone(),
        })
    }
}

/// Handle to a server running in the background.
pub struct RunningServer {
    addr: SocketAddr,
    task: Option<JoinHandle<std::io::Result<()>>>,
    shutdown: Shutdown,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Resolves when the serve loop ends without being asked to.
    ///
    /// Cancel-safe: if the future is dropped before completion the server
    /// keeps running and can still be shut down.
    pub async fn exited(&mut self) -> Result<(), ServerError> {
        let Some(task) = self.task.as_mut() else {
            return Ok(());
        };
        let result = task.await;
        self.task = None;
        flatten(result)
    }

    /// Stop accepting and wait for in-flight requests up to `deadline`.
    ///
    /// Past the deadline the serve task is aborted and
    /// [`ServerError::ShutdownTimeout`] is returned.
    pub async fn shutdown(mut self, deadline: Duration) -> Result<(), ServerError> {
        self.shutdown.trigger();

        let Some(mut task) = self.task.take() else {
            return Ok(());
        };

        match tokio::time::timeout(deadline, &mut task).await {
            Ok(result) => {
                flatten(result)?;
                tracing::info!(address = %self.addr, "HTTP server stopped");
                Ok(())
            }
            Err(_) => {
                task.abort();
                Err(ServerError::ShutdownTimeout(deadline))
            }
        }
    }
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match result {
        Ok(inner) => inner.map_err(ServerError::Serve),
        Err(e) if e.is_panic() => Err(ServerError::Panicked),
        // Cancelled: only happens after our own abort.
        Err(_) => Ok(()),
    }
}
