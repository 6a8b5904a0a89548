//! The job record and its state machine

use crate::error::{BuildError, Error, Result};
use crate::types::{JobId, JobSnapshot, Status, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Archive handed out by a successful retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Zip bytes
    pub bytes: Vec<u8>,
    /// Download name without extension
    pub name: String,
}

/// One playlist download job
///
/// Fields that the state machine guards (`status`, the counters, the artifact)
/// are only changed through the transition methods, which reject illegal moves
/// with [`Error::InvalidTransition`].
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    owner: UserId,
    status: Status,
    total: u32,
    completed: u32,
    succeeded: u32,
    artifact: Option<Arc<Vec<u8>>>,
    artifact_name: String,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a PENDING job
    pub fn new(id: JobId, owner: UserId, total: u32, artifact_name: impl Into<String>) -> Self {
        Self {
            id,
            owner,
            status: Status::Pending,
            total,
            completed: 0,
            succeeded: 0,
            artifact: None,
            artifact_name: artifact_name.into(),
            failure_reason: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Job id
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Caller that submitted the job
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Current status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Tracks in the playlist snapshot
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Tracks processed so far
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Tracks resolved successfully
    pub fn succeeded(&self) -> u32 {
        self.succeeded
    }

    /// Download name for the archive
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// Recorded failure reason
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Submission time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time the run acquired a slot
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Time the job reached COMPLETED or FAILED
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Size of the attached archive, if any
    pub fn artifact_len(&self) -> Option<usize> {
        self.artifact.as_ref().map(|a| a.len())
    }

    /// Whether `user` may see this job
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }

    /// Poll view of this job
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            status: self.status,
            completed: self.completed,
            total: self.total,
            succeeded: self.succeeded,
            failure_reason: match self.status {
                Status::Failed => self.failure_reason.clone(),
                _ => None,
            },
        }
    }

    /// PENDING → DOWNLOADING
    pub fn start(&mut self) -> Result<()> {
        if self.status != Status::Pending {
            return Err(self.invalid("start"));
        }
        self.status = Status::Downloading;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Count one processed track
    ///
    /// `completed` never passes `total`.
    pub fn record_track(&mut self, succeeded: bool) -> Result<()> {
        if self.status != Status::Downloading || self.completed >= self.total {
            return Err(self.invalid("record_track"));
        }
        self.completed += 1;
        if succeeded {
            self.succeeded += 1;
        }
        Ok(())
    }

    /// DOWNLOADING → COMPLETED with a non-empty archive
    pub fn complete(&mut self, artifact: Vec<u8>) -> Result<()> {
        if self.status != Status::Downloading || self.succeeded == 0 {
            return Err(self.invalid("complete"));
        }
        if artifact.is_empty() {
            return Err(Error::Build(BuildError::Empty));
        }
        self.artifact = Some(Arc::new(artifact));
        self.status = Status::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// Any non-terminal state → FAILED
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(self.invalid("fail"));
        }
        self.status = Status::Failed;
        self.failure_reason = Some(reason.into());
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// COMPLETED → RETRIEVED, handing out the archive
    ///
    /// Any other live status is [`Error::NotReady`]; a FAILED job carries its reason.
    pub fn take_artifact(&mut self) -> Result<Artifact> {
        match self.status {
            Status::Pending | Status::Downloading | Status::Failed => Err(Error::NotReady {
                id: self.id,
                status: self.status,
                reason: self.failure_reason.clone(),
            }),
            Status::Retrieved => Err(self.invalid("retrieve")),
            Status::Completed => {
                let artifact = self.artifact.take().ok_or_else(|| {
                    Error::Other(format!("job {} is COMPLETED without an archive", self.id))
                })?;
                self.status = Status::Retrieved;
                let bytes = Arc::try_unwrap(artifact).unwrap_or_else(|shared| (*shared).clone());
                Ok(Artifact {
                    bytes,
                    name: self.artifact_name.clone(),
                })
            }
        }
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidTransition {
            id: self.id,
            operation,
            current: self.status,
        }
    }
}
