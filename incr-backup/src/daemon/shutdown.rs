//! Graceful interruption on SIGTERM and SIGINT.
//!
//! A signal cancels the run token: the scanner stops at the next path, the
//! executor stops at the next file and still saves state for what it copied.

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shutdown coordinator
#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a new shutdown coordinator
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Token to hand to the scanner and executor
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Wait for SIGINT or SIGTERM, then cancel the run token
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                res = signal::ctrl_c() => {
                    res?;
                    info!("Received SIGINT (Ctrl+C), stopping after the current file...");
                }
                _ = terminate.recv() => {
                    info!("Received SIGTERM, stopping after the current file...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, stopping after the current file...");
        }

        self.shutdown();
        Ok(())
    }

    /// Cancel the run without waiting for a signal
    pub fn shutdown(&self) {
        self.token.cancel();
    }
}
