//! Shutdown coordination.

use crate::error::Result;
use crate::types::Event;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::PlaylistDownloader;

/// How long shutdown waits for job runs to wind down
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

impl PlaylistDownloader {
    /// Gracefully shut down the downloader
    ///
    /// This method performs a graceful shutdown sequence:
    /// 1. Stops accepting new jobs (`submit` returns [`Error::ShuttingDown`](crate::Error::ShuttingDown))
    /// 2. Cancels every job run; PENDING and DOWNLOADING jobs become FAILED
    ///    with "shutdown in progress" and their scratch directories are removed
    /// 3. Waits for runs and background services to finish, up to 30 seconds
    /// 4. Emits [`Event::Shutdown`]
    ///
    /// COMPLETED jobs stay retrievable until the process exits. Calling this
    /// more than once is harmless.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        // 1. Stop accepting new jobs
        let was_accepting = self.run_state.accepting_new.swap(false, Ordering::SeqCst);
        if !was_accepting {
            tracing::debug!("Shutdown already in progress");
        }
        tracing::info!("Stopped accepting new jobs");

        // 2. Cancel job runs and background services
        self.run_state.shutdown_token.cancel();
        self.run_state.tracker.close();

        // 3. Wait for runs to finish with timeout
        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.run_state.tracker.wait()).await {
            Ok(()) => tracing::info!("All job runs finished"),
            Err(_) => tracing::warn!(
                remaining = self.run_state.tracker.len(),
                "Timeout waiting for job runs to finish, proceeding with shutdown"
            ),
        }

        // 4. Emit shutdown event
        let _ = self.event_tx.send(Event::Shutdown);

        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    /// Whether new jobs are still accepted
    pub fn is_accepting(&self) -> bool {
        self.run_state.accepting_new.load(Ordering::SeqCst)
    }
}
