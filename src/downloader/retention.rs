//! Expiry of finished jobs that were never retrieved.

use super::PlaylistDownloader;
use crate::types::Event;
use chrono::{DateTime, Utc};

impl PlaylistDownloader {
    /// Remove COMPLETED and FAILED jobs that finished more than
    /// `download.job_retention` ago
    ///
    /// Returns the number of jobs removed. Does nothing when retention is
    /// disabled.
    pub fn purge_expired_jobs(&self) -> usize {
        let Some(retention) = self.config.download.job_retention else {
            return 0;
        };
        let Ok(retention) = chrono::Duration::from_std(retention) else {
            return 0;
        };
        match Utc::now().checked_sub_signed(retention) {
            Some(cutoff) => self.purge_finished_before(cutoff),
            None => 0,
        }
    }

    /// Remove terminal jobs that finished before `cutoff` and emit `Expired` for each
    pub(crate) fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let expired = self.store.purge_finished_before(cutoff);
        for job in &expired {
            tracing::info!(
                job_id = %job.id(),
                user = %job.owner(),
                status = %job.status(),
                "Expired unretrieved job"
            );
            self.emit_event(Event::Expired {
                job_id: job.id(),
                owner: job.owner().clone(),
            });
        }
        expired.len()
    }

    /// Run [`purge_expired_jobs`](Self::purge_expired_jobs) every
    /// `download.retention_sweep_interval` until shutdown
    ///
    /// Called by the constructors; does nothing when retention is disabled.
    pub(crate) fn start_retention_sweeper(&self) {
        if self.config.download.job_retention.is_none() {
            tracing::debug!("Job retention disabled, sweeper not started");
            return;
        }

        let downloader = self.clone();
        let period = self.config.download.retention_sweep_interval;
        let shutdown = self.run_state.shutdown_token.clone();

        self.run_state.tracker.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        tracing::debug!("Retention sweeper stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let purged = downloader.purge_expired_jobs();
                        if purged > 0 {
                            tracing::debug!(purged, "Retention sweep finished");
                        }
                    }
                }
            }
        });
    }
}
