//! Playlist job handlers: submit, status, retrieve, events.

use crate::api::AppState;
use crate::api::error_response::malformed_job_id;
use crate::types::{Caller, Event, JobId, SubmitResponse};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, KeepAlive, Sse},
    },
};
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

/// Confirmation text returned with a new job id
pub const SUBMIT_MESSAGE: &str = "Playlist download started.";

/// POST /download/playlist/:playlist_id - Start downloading a playlist
#[utoipa::path(
    post,
    path = "/download/playlist/{playlist_id}",
    tag = "downloads",
    params(
        ("playlist_id" = String, Path, description = "Catalog playlist ID")
    ),
    responses(
        (status = 202, description = "Job accepted", body = SubmitResponse),
        (status = 400, description = "Invalid playlist id or catalog error", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
        (status = 404, description = "Playlist not found or empty", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn submit_playlist(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(playlist_id): Path<String>,
) -> Response {
    match state.downloader.submit(&playlist_id, &caller).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                job_id,
                message: SUBMIT_MESSAGE.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::debug!(playlist_id, user = %caller.user_id, error = %e, "Submission rejected");
            e.into_response()
        }
    }
}

/// GET /download/status/:job_id - Poll job progress
#[utoipa::path(
    get,
    path = "/download/status/{job_id}",
    tag = "downloads",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job progress", body = crate::types::JobSnapshot),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
        (status = 403, description = "Job belongs to another user", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn get_status(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(job_id): Path<String>,
) -> Response {
    let Ok(id) = job_id.parse::<JobId>() else {
        return malformed_job_id(&job_id);
    };

    match state.downloader.poll(&id, &caller.user_id) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /download/retrieve/:job_id - Fetch the finished archive
///
/// A successful response consumes the job; later requests for the same id get 404.
#[utoipa::path(
    get,
    path = "/download/retrieve/{job_id}",
    tag = "downloads",
    params(
        ("job_id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Zip archive of the resolved tracks", content_type = "application/zip"),
        (status = 202, description = "No archive yet: job still running, or failed (reason in details)", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
        (status = 403, description = "Job belongs to another user", body = crate::error::ApiError),
        (status = 404, description = "Job not found", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn retrieve_archive(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(job_id): Path<String>,
) -> Response {
    let Ok(id) = job_id.parse::<JobId>() else {
        return malformed_job_id(&job_id);
    };

    match state.downloader.retrieve(&id, &caller.user_id) {
        Ok(artifact) => {
            let disposition = content_disposition(&artifact.name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/zip".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                artifact.bytes,
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// `attachment; filename="<name>.zip"` with quotes and backslashes escaped
fn content_disposition(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{}.zip\"", escaped)
}

/// GET /download/events - Server-sent events for the caller's own jobs
#[utoipa::path(
    get,
    path = "/download/events",
    tag = "downloads",
    responses(
        (status = 200, description = "Server-sent events stream (text/event-stream)", content_type = "text/event-stream"),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError)
    ),
    security(("bearer" = []))
)]
pub async fn event_stream(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let receiver = state.downloader.subscribe();
    let stream = BroadcastStream::new(receiver);
    let user = caller.user_id;

    let sse_stream = stream.filter_map(move |result| match result {
        Ok(event) => {
            // Shutdown concerns everyone; job events only their owner
            if event.owner().is_some_and(|owner| owner != &user) {
                return None;
            }
            to_sse(&event)
        }
        Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("SSE client lagged, skipped {} events", skipped);
            Some(Ok(SseEvent::default().event("error").data(format!(
                r#"{{"error":"lagged","skipped":{}}}"#,
                skipped
            ))))
        }
    });

    // End the stream on shutdown so graceful server shutdown is not held open
    let shutdown = state.downloader.run_state.shutdown_token.clone();
    let sse_stream = futures::StreamExt::take_until(sse_stream, shutdown.cancelled_owned());

    Sse::new(sse_stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &Event) -> Option<Result<SseEvent, Infallible>> {
    match serde_json::to_string(event) {
        Ok(json_data) => Some(Ok(SseEvent::default().event(event.kind()).data(json_data))),
        Err(e) => {
            tracing::warn!("Failed to serialize event to JSON: {}", e);
            None
        }
    }
}
