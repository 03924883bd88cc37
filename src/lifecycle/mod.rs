//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (coordinator.rs):
//!     Load config → Open resources (declared order) → Bind → Start watcher + server
//!
//! Shutdown (coordinator.rs, shutdown.rs):
//!     Signal received → Stop accepting → Drain (bounded) → Close resources (reverse)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown, once
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then resources, then listeners
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has timeout: teardown proceeds after the deadline

pub mod coordinator;
pub mod shutdown;
pub mod signals;

pub use coordinator::{exit_status, Coordinator, LifecycleError, LifecycleState, ShutdownOutcome};
pub use shutdown::Shutdown;
pub use signals::{Signals, TerminationSignal};
