//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events and spans (request spans carry the request ID)
//!
//! Consumers:
//!     → logging.rs (stdout or rolling file, pretty or JSON)
//! ```

pub mod logging;

pub use logging::{LogGuard, LoggingError};
