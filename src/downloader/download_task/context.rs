//! Job run context: everything a background run needs, detached from the downloader.

use crate::config::Config;
use crate::error::Error;
use crate::jobs::JobStore;
use crate::resolver::TrackResolver;
use crate::types::{Event, JobId, UserId};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Shared state for one job run
pub(crate) struct JobRunContext {
    pub(crate) id: JobId,
    pub(crate) owner: UserId,
    pub(crate) store: Arc<dyn JobStore>,
    pub(crate) event_tx: broadcast::Sender<Event>,
    pub(crate) resolver: Arc<dyn TrackResolver>,
    pub(crate) config: Arc<Config>,
    pub(crate) cancel_token: CancellationToken,
}

impl JobRunContext {
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Move the job to FAILED with `reason` and emit `Failed`
    ///
    /// Returns false when the job was already terminal or no longer exists;
    /// the first recorded reason wins.
    pub(crate) fn mark_failed(&self, reason: &str) -> bool {
        match self.store.update(&self.id, &mut |job| job.fail(reason)) {
            Ok(_) => {
                tracing::warn!(job_id = %self.id, reason, "Job failed");
                self.emit(Event::Failed {
                    job_id: self.id,
                    owner: self.owner.clone(),
                    reason: reason.to_string(),
                });
                true
            }
            Err(Error::InvalidTransition { current, .. }) => {
                tracing::debug!(job_id = %self.id, %current, reason, "Job already finished");
                false
            }
            Err(e) => {
                tracing::debug!(job_id = %self.id, error = %e, "Could not mark job failed");
                false
            }
        }
    }
}
