//! Job registry

use super::job::{Artifact, Job};
use crate::error::{Error, Result};
use crate::types::{JobId, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Concurrency-safe registry of jobs keyed by id
///
/// The store is injected into the downloader as `Arc<dyn JobStore>`; there is no
/// process-wide registry. Ownership checks are not the store's concern.
pub trait JobStore: Send + Sync {
    /// Register a PENDING job and return its fresh id
    ///
    /// The id never collides with a job that is still in the store.
    fn create(&self, owner: UserId, total: u32, artifact_name: String) -> JobId;

    /// Copy of the current record
    fn get(&self, id: &JobId) -> Result<Job>;

    /// Apply `mutator` to the record under the store lock
    ///
    /// Updates to one job are serialized. If the mutator returns an error the
    /// stored record is left exactly as it was. Returns the updated record.
    fn update(&self, id: &JobId, mutator: &mut dyn FnMut(&mut Job) -> Result<()>)
    -> Result<Job>;

    /// Remove a job regardless of its state
    fn delete(&self, id: &JobId) -> Result<Job>;

    /// Hand out the archive of a COMPLETED job and remove the job
    ///
    /// The COMPLETED → RETRIEVED transition and the removal happen under one
    /// lock, so at most one caller ever receives the archive.
    fn take_artifact(&self, id: &JobId) -> Result<Artifact>;

    /// Remove terminal jobs that finished before `cutoff`
    fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<Job>;

    /// Number of jobs in the store
    fn len(&self) -> usize;

    /// Whether the store holds no jobs
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`JobStore`] backed by a mutex-guarded map
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: Mutex<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    // Mutators run on a copy, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, owner: UserId, total: u32, artifact_name: String) -> JobId {
        let mut jobs = self.lock();
        let mut id = JobId::new_v4();
        while jobs.contains_key(&id) {
            id = JobId::new_v4();
        }
        jobs.insert(id, Job::new(id, owner, total, artifact_name));
        id
    }

    fn get(&self, id: &JobId) -> Result<Job> {
        self.lock().get(id).cloned().ok_or(Error::JobNotFound(*id))
    }

    fn update(
        &self,
        id: &JobId,
        mutator: &mut dyn FnMut(&mut Job) -> Result<()>,
    ) -> Result<Job> {
        let mut jobs = self.lock();
        let current = jobs.get_mut(id).ok_or(Error::JobNotFound(*id))?;
        let mut next = current.clone();
        mutator(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    fn delete(&self, id: &JobId) -> Result<Job> {
        self.lock().remove(id).ok_or(Error::JobNotFound(*id))
    }

    fn take_artifact(&self, id: &JobId) -> Result<Artifact> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(id).ok_or(Error::JobNotFound(*id))?;
        let artifact = job.take_artifact()?;
        jobs.remove(id);
        Ok(artifact)
    }

    fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        let mut jobs = self.lock();
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| job.status().is_terminal())
            .filter(|job| job.finished_at().is_some_and(|at| at < cutoff))
            .map(|job| job.id())
            .collect();

        expired.iter().filter_map(|id| jobs.remove(id)).collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
