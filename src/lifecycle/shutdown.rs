//! Signal handling for graceful shutdown.

use tracing::debug;

/// Handles shutdown signals (Ctrl-C everywhere, SIGTERM on Unix).
pub struct ShutdownSignal;

impl ShutdownSignal {
    /// Create a new shutdown signal handler.
    pub fn new() -> Self {
        Self
    }

    /// Wait for a shutdown signal.
    #[cfg(unix)]
    pub async fn wait(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = sigterm.recv() => {
                debug!("received SIGTERM");
            }
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    debug!("received Ctrl-C");
                }
            }
        }
    }

    /// Wait for a shutdown signal.
    #[cfg(not(unix))]
    pub async fn wait(&self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("received Ctrl-C");
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
