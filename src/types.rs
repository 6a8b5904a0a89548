//! Core types for playlist-dl

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a playlist download job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    /// Generate a fresh random identifier
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for JobId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of a catalog user (the job owner)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a new UserId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated identity of an API caller
///
/// The access token is the caller's catalog token; it is forwarded to the
/// catalog when fetching playlists on the caller's behalf.
#[derive(Clone)]
pub struct Caller {
    /// Catalog user id
    pub user_id: UserId,
    /// Catalog access token
    pub access_token: String,
}

impl Caller {
    /// Create a new caller identity
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            access_token: access_token.into(),
        }
    }
}

// Never print the token.
impl std::fmt::Debug for Caller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caller")
            .field("user_id", &self.user_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Job status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Created, waiting for a download slot
    Pending,
    /// Tracks are being resolved
    Downloading,
    /// Archive built and ready for retrieval
    Completed,
    /// Failed with a reason
    Failed,
    /// Archive handed out; the job is about to be removed
    Retrieved,
}

impl Status {
    /// Whether the orchestrator is done with a job in this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Failed | Status::Retrieved)
    }

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "PENDING",
            Status::Downloading => "DOWNLOADING",
            Status::Completed => "COMPLETED",
            Status::Failed => "FAILED",
            Status::Retrieved => "RETRIEVED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One track to resolve, taken from the playlist snapshot
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackRequest {
    /// Track title
    pub title: String,
    /// Artist names joined with ", "
    pub artists: String,
}

impl TrackRequest {
    /// Create a track request from a title and a list of artist names
    pub fn new<I, S>(title: impl Into<String>, artists: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let artists = artists
            .into_iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| !a.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            title: title.into().trim().to_string(),
            artists,
        }
    }

    /// Search query handed to the audio extractor
    pub fn search_query(&self) -> String {
        match (self.title.is_empty(), self.artists.is_empty()) {
            (false, false) => format!("{} {} audio", self.title, self.artists),
            (false, true) => format!("{} audio", self.title),
            (true, false) => format!("{} audio", self.artists),
            (true, true) => "audio".to_string(),
        }
    }

    /// Short human label for logs and events
    pub fn label(&self) -> String {
        if self.artists.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artists, self.title)
        }
    }
}

/// Playlist snapshot returned by the catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Playlist {
    /// Catalog playlist id
    pub id: String,
    /// Playlist display name
    pub name: String,
    /// Tracks in playlist order
    pub tracks: Vec<TrackRequest>,
}

/// Progress report returned by status polls
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Job id
    pub job_id: JobId,
    /// Current status
    pub status: Status,
    /// Tracks processed so far (successful or not)
    pub completed: u32,
    /// Tracks in the playlist
    pub total: u32,
    /// Tracks that were resolved successfully
    pub succeeded: u32,
    /// Failure explanation, present only for FAILED jobs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Response body for an accepted submission
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitResponse {
    /// Handle used for polling and retrieval
    pub job_id: JobId,
    /// Human-readable confirmation
    pub message: String,
}

/// What the running service can do, reported by the health endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    /// Active track resolver ("yt-dlp" or "noop")
    pub resolver: String,
    /// Whether tracks can actually be downloaded
    pub can_resolve: bool,
    /// Active catalog client
    pub catalog: String,
}

/// Event emitted during the job lifecycle
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted and queued
    Submitted {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
        /// Playlist name
        name: String,
        /// Number of tracks
        total: u32,
    },

    /// Job acquired a slot and started resolving tracks
    Started {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
    },

    /// One track resolved
    TrackResolved {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
        /// Track label
        track: String,
        /// Tracks processed so far
        completed: u32,
        /// Tracks in the job
        total: u32,
    },

    /// One track failed (the job keeps going)
    TrackFailed {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
        /// Track label
        track: String,
        /// Failure description
        error: String,
        /// Tracks processed so far
        completed: u32,
        /// Tracks in the job
        total: u32,
    },

    /// Archive ready for retrieval
    Completed {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
        /// Tracks in the archive
        succeeded: u32,
        /// Tracks in the job
        total: u32,
        /// Archive size in bytes
        size_bytes: u64,
    },

    /// Job failed
    Failed {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
        /// Failure reason
        reason: String,
    },

    /// Archive was handed out and the job removed
    Retrieved {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
    },

    /// Job removed by the retention sweeper without being retrieved
    Expired {
        /// Job id
        job_id: JobId,
        /// Job owner
        owner: UserId,
    },

    /// Service is shutting down
    Shutdown,
}

impl Event {
    /// Owner of the job this event refers to (None for service-wide events)
    pub fn owner(&self) -> Option<&UserId> {
        match self {
            Event::Submitted { owner, .. }
            | Event::Started { owner, .. }
            | Event::TrackResolved { owner, .. }
            | Event::TrackFailed { owner, .. }
            | Event::Completed { owner, .. }
            | Event::Failed { owner, .. }
            | Event::Retrieved { owner, .. }
            | Event::Expired { owner, .. } => Some(owner),
            Event::Shutdown => None,
        }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Submitted { .. } => "submitted",
            Event::Started { .. } => "started",
            Event::TrackResolved { .. } => "track_resolved",
            Event::TrackFailed { .. } => "track_failed",
            Event::Completed { .. } => "completed",
            Event::Failed { .. } => "failed",
            Event::Retrieved { .. } => "retrieved",
            Event::Expired { .. } => "expired",
            Event::Shutdown => "shutdown",
        }
    }
}
