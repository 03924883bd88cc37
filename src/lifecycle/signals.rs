//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for SIGINT and SIGTERM (Ctrl-C elsewhere)
//! - Hand the first termination signal to the coordinator
//! - Log and ignore any signal that arrives after shutdown began

/// A signal that asks the process to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

/// Registered termination signal streams.
pub struct Signals {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Signals {
    /// Register the handlers. Must be called inside a Tokio runtime.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Next termination signal, or `None` if the streams closed.
    #[cfg(unix)]
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        tokio::select! {
            s = self.interrupt.recv() => s.map(|_| TerminationSignal::Interrupt),
            s = self.terminate.recv() => s.map(|_| TerminationSignal::Terminate),
        }
    }

    #[cfg(not(unix))]
    pub async fn recv(&mut self) -> Option<TerminationSignal> {
        tokio::signal::ctrl_c()
            .await
            .ok()
            .map(|_| TerminationSignal::Interrupt)
    }

    /// Wait for the first termination signal.
    ///
    /// Consumes the handlers: later signals are drained by a background
    /// task that only logs them, so a second Ctrl-C during shutdown does not
    /// kill the process.
    pub async fn wait(mut self) -> Option<TerminationSignal> {
        let first = self.recv().await;
        if let Some(signal) = first {
            tracing::info!(signal = ?signal, "Shutdown signal received");
            tokio::spawn(async move {
                while let Some(signal) = self.recv().await {
                    tracing::warn!(
                        signal = ?signal,
                        "Shutdown already in progress, ignoring signal"
                    );
                }
            });
        }
        first
    }
}
