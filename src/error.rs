//! Error types for playlist-dl
//!
//! This module provides the error handling for the library, including:
//! - The crate-wide [`Error`] type used by the job API, store and catalog
//! - [`ResolutionError`] for single-track failures (recovered, never fatal to a job)
//! - [`BuildError`] for archive assembly failures (fatal to a job)
//! - HTTP status code mapping and structured JSON error bodies for the REST API

use crate::types::{JobId, Status};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download.scratch_dir")
        key: Option<String>,
    },

    /// Bad or missing input
    #[error("validation error: {0}")]
    Validation(String),

    /// Job id is unknown (never existed, already retrieved, or expired)
    #[error("job {0} not found")]
    JobNotFound(JobId),

    /// Playlist does not exist in the catalog
    #[error("playlist {0} not found")]
    PlaylistNotFound(String),

    /// Playlist exists but has no downloadable tracks
    #[error("playlist {0} has no tracks")]
    EmptyPlaylist(String),

    /// Caller does not own the job
    #[error("job {0} belongs to another user")]
    Forbidden(JobId),

    /// Caller could not be authenticated
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Job has no archive to hand out (any status other than COMPLETED)
    #[error("job {id} is not ready (status {status})")]
    NotReady {
        /// The job id
        id: JobId,
        /// The job's current status
        status: Status,
        /// Failure reason when the job is FAILED
        reason: Option<String>,
    },

    /// Illegal state machine move
    #[error("job {id} cannot {operation} while {current}")]
    InvalidTransition {
        /// The job id
        id: JobId,
        /// The attempted operation (e.g., "start", "complete")
        operation: &'static str,
        /// The status that prevents the operation
        current: Status,
    },

    /// Catalog (music service) call failed
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Single-track resolution failure
    #[error("resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    /// Archive assembly failure
    #[error("archive error: {0}")]
    Build(#[from] BuildError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Shutdown in progress - not accepting new jobs
    #[error("shutdown in progress: not accepting new jobs")]
    ShuttingDown,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Why a single track could not be turned into a local audio file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// The search returned nothing usable
    #[error("no match for \"{query}\"")]
    NotFound {
        /// The search query that produced no result
        query: String,
    },

    /// Transient network failure while searching or downloading
    #[error("network failure for \"{query}\": {reason}")]
    Network {
        /// The search query
        query: String,
        /// Tool output describing the failure
        reason: String,
    },

    /// The extractor or its post-processor failed
    #[error("extraction failed for \"{query}\": {reason}")]
    Extraction {
        /// The search query
        query: String,
        /// Tool output describing the failure
        reason: String,
    },

    /// The per-track time budget was exhausted
    #[error("timed out after {seconds}s for \"{query}\"")]
    Timeout {
        /// The search query
        query: String,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// No extractor is available on this host
    #[error("audio extractor unavailable: {0}")]
    Unavailable(String),

    /// Local filesystem failure
    #[error("I/O failure: {0}")]
    Io(String),

    /// The resolver panicked while handling this track
    #[error("resolver panicked for \"{query}\": {message}")]
    Panicked {
        /// The search query
        query: String,
        /// Panic payload, when it was a string
        message: String,
    },
}

/// Archive assembly failures
#[derive(Debug, Error)]
pub enum BuildError {
    /// No input file could be added
    #[error("no files could be added to the archive")]
    Empty,

    /// A source file could not be read
    #[error("failed to read {path}: {reason}")]
    ReadFailed {
        /// The source file
        path: PathBuf,
        /// The underlying failure
        reason: String,
    },

    /// The zip writer failed
    #[error("zip writer failed: {0}")]
    Zip(String),

    /// The blocking build task died
    #[error("archive task aborted: {0}")]
    Aborted(String),
}

impl From<zip::result::ZipError> for BuildError {
    fn from(e: zip::result::ZipError) -> Self {
        BuildError::Zip(e.to_string())
    }
}

/// API error response format
///
/// This structure is returned by API endpoints when an error occurs.
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "job_not_found",
///     "message": "job 6f1c... not found",
///     "details": {
///       "job_id": "6f1c..."
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "job_not_found", "validation_error")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }

    /// Create an "internal server error"
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("internal_error", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - invalid input or the catalog call itself errored
            Error::Config { .. } => 400,
            Error::Validation(_) => 400,
            Error::Catalog(_) => 400,

            // 401 / 403
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,

            // 404 Not Found
            Error::JobNotFound(_) => 404,
            Error::PlaylistNotFound(_) => 404,
            Error::EmptyPlaylist(_) => 404,

            // 202 Accepted - still working, poll again
            Error::NotReady { .. } => 202,

            // 409 Conflict
            Error::InvalidTransition { .. } => 409,

            // 500 Internal Server Error
            Error::Resolution(_) => 500,
            Error::Build(_) => 500,
            Error::Io(_) => 500,
            Error::Serialization(_) => 500,
            Error::ApiServerError(_) => 500,
            Error::Other(_) => 500,

            // 502 Bad Gateway - unconverted transport failure
            Error::Network(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Validation(_) => "validation_error",
            Error::JobNotFound(_) => "job_not_found",
            Error::PlaylistNotFound(_) => "playlist_not_found",
            Error::EmptyPlaylist(_) => "empty_playlist",
            Error::Forbidden(_) => "forbidden",
            Error::Unauthorized(_) => "unauthorized",
            Error::NotReady { .. } => "not_ready",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::Catalog(_) => "catalog_error",
            Error::Resolution(e) => match e {
                ResolutionError::NotFound { .. } => "track_not_found",
                ResolutionError::Network { .. } => "track_network_error",
                ResolutionError::Extraction { .. } => "track_extraction_failed",
                ResolutionError::Timeout { .. } => "track_timeout",
                ResolutionError::Unavailable(_) => "extractor_unavailable",
                ResolutionError::Io(_) => "io_error",
                ResolutionError::Panicked { .. } => "track_panicked",
            },
            Error::Build(e) => match e {
                BuildError::Empty => "archive_empty",
                BuildError::ReadFailed { .. } => "archive_read_failed",
                BuildError::Zip(_) => "archive_write_failed",
                BuildError::Aborted(_) => "archive_aborted",
            },
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::ApiServerError(_) => "api_server_error",
            Error::ShuttingDown => "shutting_down",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        // Add contextual details for specific error types
        let details = match &error {
            Error::JobNotFound(id) | Error::Forbidden(id) => Some(serde_json::json!({
                "job_id": id,
            })),
            Error::PlaylistNotFound(playlist) | Error::EmptyPlaylist(playlist) => {
                Some(serde_json::json!({
                    "playlist_id": playlist,
                }))
            }
            Error::NotReady {
                id,
                status,
                reason: Some(reason),
            } => Some(serde_json::json!({
                "job_id": id,
                "status": status,
                "failure_reason": reason,
            })),
            Error::NotReady { id, status, .. } => Some(serde_json::json!({
                "job_id": id,
                "status": status,
            })),
            Error::InvalidTransition {
                id,
                operation,
                current,
            } => Some(serde_json::json!({
                "job_id": id,
                "operation": operation,
                "current_status": current,
            })),
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    /// Returns a vec of (Error, expected_status_code, expected_error_code) for
    /// every reachable match arm in ToHttpStatus.
    fn all_error_variants() -> Vec<(Error, u16, &'static str)> {
        let id = JobId::new_v4();
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("download.scratch_dir".into()),
                },
                400,
                "config_error",
            ),
            (
                Error::Validation("empty id".into()),
                400,
                "validation_error",
            ),
            (Error::JobNotFound(id), 404, "job_not_found"),
            (
                Error::PlaylistNotFound("37i9dQ".into()),
                404,
                "playlist_not_found",
            ),
            (Error::EmptyPlaylist("37i9dQ".into()), 404, "empty_playlist"),
            (Error::Forbidden(id), 403, "forbidden"),
            (Error::Unauthorized("expired".into()), 401, "unauthorized"),
            (
                Error::NotReady {
                    id,
                    status: Status::Downloading,
                    reason: None,
                },
                202,
                "not_ready",
            ),
            (
                Error::NotReady {
                    id,
                    status: Status::Failed,
                    reason: Some("Could not download any tracks.".into()),
                },
                202,
                "not_ready",
            ),
            (
                Error::InvalidTransition {
                    id,
                    operation: "start",
                    current: Status::Completed,
                },
                409,
                "invalid_transition",
            ),
            (Error::Catalog("HTTP 500".into()), 400, "catalog_error"),
            (
                Error::Resolution(ResolutionError::NotFound {
                    query: "x audio".into(),
                }),
                500,
                "track_not_found",
            ),
            (
                Error::Resolution(ResolutionError::Timeout {
                    query: "x audio".into(),
                    seconds: 5,
                }),
                500,
                "track_timeout",
            ),
            (
                Error::Resolution(ResolutionError::Panicked {
                    query: "x audio".into(),
                    message: "boom".into(),
                }),
                500,
                "track_panicked",
            ),
            (Error::Build(BuildError::Empty), 500, "archive_empty"),
            (
                Error::Build(BuildError::Zip("bad header".into())),
                500,
                "archive_write_failed",
            ),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                500,
                "io_error",
            ),
            (
                Error::ApiServerError("bind failed".into()),
                500,
                "api_server_error",
            ),
            (Error::Other("unknown".into()), 500, "internal_error"),
            (Error::ShuttingDown, 503, "shutting_down"),
        ]
    }

    #[test]
    fn every_variant_maps_to_expected_status_code() {
        for (error, expected_status, _) in all_error_variants() {
            assert_eq!(
                error.status_code(),
                expected_status,
                "status code mismatch for {error:?}"
            );
        }
    }

    #[test]
    fn every_variant_maps_to_expected_error_code() {
        for (error, _, expected_code) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected_code,
                "error code mismatch for {error:?}"
            );
        }
    }

    #[test]
    fn empty_playlist_is_404_like_missing_playlist() {
        assert_eq!(Error::EmptyPlaylist("p".into()).status_code(), 404);
        assert_eq!(Error::PlaylistNotFound("p".into()).status_code(), 404);
    }

    #[test]
    fn forbidden_is_403_not_404() {
        assert_eq!(Error::Forbidden(JobId::new_v4()).status_code(), 403);
    }

    #[test]
    fn api_error_from_job_not_found_has_job_id() {
        let id = JobId::new_v4();
        let api_error: ApiError = Error::JobNotFound(id).into();

        assert_eq!(api_error.error.code, "job_not_found");
        let details = api_error.error.details.unwrap();
        assert_eq!(details["job_id"], id.to_string());
    }

    #[test]
    fn api_error_from_failed_not_ready_carries_reason() {
        let id = JobId::new_v4();
        let api_error: ApiError = Error::NotReady {
            id,
            status: Status::Failed,
            reason: Some("Could not download any tracks.".into()),
        }
        .into();

        assert_eq!(api_error.error.code, "not_ready");
        let details = api_error.error.details.unwrap();
        assert_eq!(details["status"], "FAILED");
        assert_eq!(details["failure_reason"], "Could not download any tracks.");
    }

    #[test]
    fn api_error_from_not_ready_has_status() {
        let api_error: ApiError = Error::NotReady {
            id: JobId::new_v4(),
            status: Status::Pending,
            reason: None,
        }
        .into();

        let details = api_error.error.details.unwrap();
        assert_eq!(details["status"], "PENDING");
        assert!(details.get("failure_reason").is_none());
    }

    #[test]
    fn api_error_from_invalid_transition_has_operation_and_status() {
        let api_error: ApiError = Error::InvalidTransition {
            id: JobId::new_v4(),
            operation: "complete",
            current: Status::Failed,
        }
        .into();

        let details = api_error.error.details.unwrap();
        assert_eq!(details["operation"], "complete");
        assert_eq!(details["current_status"], "FAILED");
    }

    #[test]
    fn api_error_without_context_has_no_details() {
        let api_error: ApiError = Error::ShuttingDown.into();
        assert!(api_error.error.details.is_none());
        assert!(api_error.error.message.contains("shutdown"));
    }

    #[test]
    fn resolution_error_messages_include_query() {
        let err = ResolutionError::Extraction {
            query: "Song Artist audio".into(),
            reason: "ffmpeg not found".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Song Artist audio"));
        assert!(msg.contains("ffmpeg not found"));
    }

    #[test]
    fn zip_error_converts_to_build_error() {
        let err: BuildError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, BuildError::Zip(_)));
    }
}
