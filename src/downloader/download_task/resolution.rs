//! Track resolution -- bounded-parallel resolver calls with per-track timeout and retry.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::{FutureExt, StreamExt};

use crate::error::{Error, ResolutionError};
use crate::retry::retry_with_backoff;
use crate::types::{Event, TrackRequest};

use super::context::JobRunContext;

/// Aggregated result of resolving every track of a job.
pub(super) struct ResolutionOutcome {
    /// Resolved files, in playlist order
    pub(super) resolved: Vec<PathBuf>,
    pub(super) failed_count: usize,
    pub(super) first_error: Option<String>,
}

/// Resolve every track, at most `track_concurrency` at a time
///
/// Each track gets its own subdirectory of `scratch` so that two tracks with
/// the same title cannot overwrite each other. Progress is recorded on the job
/// as each track finishes, successful or not. If progress cannot be recorded
/// the run stops with that error and the remaining tracks are dropped.
pub(super) async fn resolve_tracks(
    ctx: &JobRunContext,
    tracks: &[TrackRequest],
    scratch: &Path,
) -> Result<ResolutionOutcome, Error> {
    let concurrency = ctx.config.download.track_concurrency.max(1);

    let mut results = futures::stream::iter(0..tracks.len())
        .map(|index| async move {
            let track = &tracks[index];
            let dir = scratch.join(format!("{:04}", index));
            let result = resolve_one(ctx, track, &dir).await;
            (index, track, result)
        })
        .buffer_unordered(concurrency);

    let mut resolved = Vec::with_capacity(tracks.len());
    let mut failed_count = 0;
    let mut first_error = None;

    while let Some((index, track, result)) = results.next().await {
        let (completed, total) = match ctx
            .store
            .update(&ctx.id, &mut |job| job.record_track(result.is_ok()))
        {
            Ok(job) => (job.completed(), job.total()),
            Err(e) => {
                tracing::error!(
                    job_id = %ctx.id,
                    track = %track.label(),
                    error = %e,
                    "Failed to record track progress"
                );
                return Err(e);
            }
        };

        match result {
            Ok(path) => {
                tracing::debug!(
                    job_id = %ctx.id,
                    track = %track.label(),
                    path = %path.display(),
                    completed,
                    total,
                    "Track resolved"
                );
                ctx.emit(Event::TrackResolved {
                    job_id: ctx.id,
                    owner: ctx.owner.clone(),
                    track: track.label(),
                    completed,
                    total,
                });
                resolved.push((index, path));
            }
            Err(e) => {
                tracing::warn!(
                    job_id = %ctx.id,
                    track = %track.label(),
                    error = %e,
                    completed,
                    total,
                    "Track failed"
                );
                ctx.emit(Event::TrackFailed {
                    job_id: ctx.id,
                    owner: ctx.owner.clone(),
                    track: track.label(),
                    error: e.to_string(),
                    completed,
                    total,
                });
                failed_count += 1;
                first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    resolved.sort_by_key(|(index, _)| *index);
    Ok(ResolutionOutcome {
        resolved: resolved.into_iter().map(|(_, path)| path).collect(),
        failed_count,
        first_error,
    })
}

/// Resolve one track within the per-track time budget
///
/// Retries of transient failures count against the same budget. Running out
/// of time drops the resolver call, which kills any child process it started.
/// A panic inside the resolver is reported as [`ResolutionError::Panicked`]
/// for this track only.
async fn resolve_one(
    ctx: &JobRunContext,
    track: &TrackRequest,
    dir: &Path,
) -> Result<PathBuf, ResolutionError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ResolutionError::Io(e.to_string()))?;

    let budget = ctx.config.download.track_timeout;
    let resolver = &ctx.resolver;
    let attempts = retry_with_backoff(&ctx.config.retry, move || resolver.resolve(track, dir));

    match AssertUnwindSafe(tokio::time::timeout(budget, attempts))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ResolutionError::Timeout {
            query: track.search_query(),
            seconds: budget.as_secs(),
        }),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                job_id = %ctx.id,
                track = %track.label(),
                panic = %message,
                "Resolver panicked"
            );
            Err(ResolutionError::Panicked {
                query: track.search_query(),
                message,
            })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
