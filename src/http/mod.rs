//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful drain)
//!     → request.rs (request ID)
//!     → routes.rs (request-processing component)
//!     → Send to client
//! ```

pub mod request;
pub mod routes;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use routes::{setup_router, AppState};
pub use server::{HttpServer, RunningServer, ServerError};
