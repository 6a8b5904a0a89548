//! Job run orchestration: top-level lifecycle for a single job.

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::Semaphore;

use crate::types::{Event, JobId, TrackRequest};

use super::context::JobRunContext;
use super::finalization::finalize_job;
use super::resolution::resolve_tracks;
use super::{PROGRESS_REASON, SHUTDOWN_REASON};

/// Core job run -- orchestrates the full lifecycle of a single job.
///
/// Phases:
/// 1. Wait for a job slot (the job stays PENDING meanwhile)
/// 2. Transition to DOWNLOADING
/// 3. Create the job's scratch directory
/// 4. Resolve all tracks with bounded parallelism
/// 5. Evaluate results, build the archive, set the final status
///
/// Shutdown cancels phases 1 and 4; the job is then FAILED with
/// "shutdown in progress". A track whose progress cannot be recorded also
/// ends the run as FAILED, so the archive never disagrees with the counters. The scratch directory is removed on every exit path.
pub(crate) async fn run_job(
    ctx: Arc<JobRunContext>,
    tracks: Vec<TrackRequest>,
    slots: Arc<Semaphore>,
) {
    let id = ctx.id;

    // Phase 1: Wait for a slot
    let _permit = tokio::select! {
        biased;
        _ = ctx.cancel_token.cancelled() => {
            ctx.mark_failed(SHUTDOWN_REASON);
            return;
        }
        permit = slots.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                ctx.mark_failed(SHUTDOWN_REASON);
                return;
            }
        },
    };

    // Phase 2: PENDING -> DOWNLOADING
    if let Err(e) = ctx.store.update(&id, &mut |job| job.start()) {
        tracing::warn!(job_id = %id, error = %e, "Job could not be started");
        return;
    }
    tracing::info!(job_id = %id, tracks = tracks.len(), "Job started");
    ctx.emit(Event::Started {
        job_id: id,
        owner: ctx.owner.clone(),
    });

    // Phase 3: Scratch directory
    let scratch = match create_scratch_dir(&ctx.config.download.scratch_dir, id).await {
        Ok(dir) => dir,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to create scratch directory");
            ctx.mark_failed(&format!("Failed to create scratch directory: {}", e));
            return;
        }
    };

    // Phase 4: Resolve tracks
    let outcome = tokio::select! {
        biased;
        _ = ctx.cancel_token.cancelled() => None,
        outcome = resolve_tracks(&ctx, &tracks, scratch.path()) => Some(outcome),
    };
    let outcome = match outcome {
        Some(Ok(outcome)) => outcome,
        Some(Err(e)) => {
            ctx.mark_failed(&format!("{}: {}", PROGRESS_REASON, e));
            return;
        }
        None => {
            tracing::info!(job_id = %id, "Job interrupted by shutdown");
            ctx.mark_failed(SHUTDOWN_REASON);
            return;
        }
    };

    // Phase 5: Finalize based on results
    finalize_job(&ctx, outcome, scratch).await;
}

/// Create `<parent>/job-<id>-XXXX`, creating `parent` first if needed
async fn create_scratch_dir(parent: &Path, id: JobId) -> std::io::Result<TempDir> {
    tokio::fs::create_dir_all(parent).await?;
    tempfile::Builder::new()
        .prefix(&format!("job-{}-", id))
        .tempdir_in(parent)
}
