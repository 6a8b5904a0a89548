//! Job finalization: evaluate results, build the archive, set final status.

use tempfile::TempDir;

use crate::archive::{ArchiveEntry, build_archive_blocking};
use crate::types::Event;

use super::context::JobRunContext;
use super::resolution::ResolutionOutcome;
use super::NO_TRACKS_REASON;

/// Evaluate resolution results and finalize the job status.
///
/// No resolved track means FAILED. Otherwise the resolved files are zipped in
/// playlist order, the scratch directory is removed, and the job moves to
/// COMPLETED holding the archive.
pub(super) async fn finalize_job(ctx: &JobRunContext, outcome: ResolutionOutcome, scratch: TempDir) {
    let id = ctx.id;
    let ResolutionOutcome {
        resolved,
        failed_count,
        first_error,
    } = outcome;

    if resolved.is_empty() {
        tracing::error!(
            job_id = %id,
            failed = failed_count,
            first_error = first_error.as_deref().unwrap_or("none"),
            "No track could be resolved"
        );
        ctx.mark_failed(NO_TRACKS_REASON);
        return;
    }

    if failed_count > 0 {
        tracing::warn!(
            job_id = %id,
            failed = failed_count,
            succeeded = resolved.len(),
            "Job finished with some track failures"
        );
    }

    let entries = resolved.into_iter().map(ArchiveEntry::from_path).collect();
    let built = match build_archive_blocking(entries).await {
        Ok(built) => built,
        Err(e) => {
            tracing::error!(job_id = %id, error = %e, "Failed to build archive");
            ctx.mark_failed(&format!("Failed to build archive: {}", e));
            return;
        }
    };

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        tracing::warn!(
            job_id = %id,
            path = %scratch_path.display(),
            error = %e,
            "Failed to remove scratch directory"
        );
    }

    let size_bytes = built.bytes.len() as u64;
    let entries = built.entries.len();
    let mut bytes = Some(built.bytes);
    let job = match ctx
        .store
        .update(&id, &mut |job| job.complete(bytes.take().unwrap_or_default()))
    {
        Ok(job) => job,
        Err(e) => {
            tracing::warn!(job_id = %id, error = %e, "Could not complete job");
            ctx.mark_failed(&format!("Failed to store archive: {}", e));
            return;
        }
    };

    tracing::info!(
        job_id = %id,
        succeeded = job.succeeded(),
        total = job.total(),
        entries,
        size_bytes,
        "Job completed"
    );
    ctx.emit(Event::Completed {
        job_id: id,
        owner: ctx.owner.clone(),
        succeeded: job.succeeded(),
        total: job.total(),
        size_bytes,
    });
}
