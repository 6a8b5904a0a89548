//! Job execution -- supervised background run for each submitted playlist.
//!
//! Split into focused submodules:
//! - [`context`] - Shared state handed to a run
//! - [`orchestration`] - Top-level run lifecycle
//! - [`resolution`] - Bounded-parallel track resolution
//! - [`finalization`] - Result evaluation, archive and final status

mod context;
mod finalization;
mod orchestration;
mod resolution;


pub(crate) use context::JobRunContext;
pub(crate) use orchestration::run_job;

use super::PlaylistDownloader;
use crate::types::{JobId, TrackRequest, UserId};
use std::sync::Arc;

/// Failure reason for jobs interrupted by shutdown
pub(crate) const SHUTDOWN_REASON: &str = "shutdown in progress";

/// Failure reason when every track failed
pub(crate) const NO_TRACKS_REASON: &str = "Could not download any tracks.";

/// Failure reason prefix when track progress could not be recorded
pub(crate) const PROGRESS_REASON: &str = "Failed to record track progress";

/// Failure reason when a run panicked outside track resolution
pub(crate) const PANIC_REASON: &str = "internal error while downloading";

impl PlaylistDownloader {
    /// Spawn the supervised background run for a freshly created job
    ///
    /// Resolver panics are contained per track. The run itself is a separate
    /// task so that a panic anywhere else in it is observed by the supervisor,
    /// which moves the job to FAILED. The run's scratch directory is dropped
    /// during unwinding.
    pub(crate) fn spawn_job(&self, id: JobId, owner: UserId, tracks: Vec<TrackRequest>) {
        let ctx = Arc::new(JobRunContext {
            id,
            owner,
            store: self.store.clone(),
            event_tx: self.event_tx.clone(),
            resolver: self.services.resolver.clone(),
            config: self.config.clone(),
            cancel_token: self.run_state.shutdown_token.child_token(),
        });
        let slots = self.run_state.job_slots.clone();

        self.run_state.tracker.spawn(async move {
            let run = tokio::spawn(run_job(ctx.clone(), tracks, slots));
            match run.await {
                Ok(()) => {}
                Err(e) if e.is_panic() => {
                    tracing::error!(job_id = %ctx.id, "Job run panicked");
                    ctx.mark_failed(PANIC_REASON);
                }
                Err(e) => {
                    tracing::error!(job_id = %ctx.id, error = %e, "Job run aborted");
                    ctx.mark_failed(SHUTDOWN_REASON);
                }
            }
        });
    }
}
