//! Shared test helpers: fake catalog, scripted resolver, downloader factory.

use crate::catalog::Catalog;
use crate::config::{Config, RetryConfig};
use crate::downloader::PlaylistDownloader;
use crate::error::{Error, ResolutionError, Result};
use crate::jobs::{Artifact, InMemoryJobStore, Job, JobStore};
use crate::resolver::{ResolverCapabilities, TrackResolver};
use crate::types::{JobId, JobSnapshot, Playlist, Status, TrackRequest, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

/// Token accepted by [`FakeCatalog::standard`] for user `alice`
pub(crate) const ALICE_TOKEN: &str = "token-alice";
/// Token accepted by [`FakeCatalog::standard`] for user `bob`
pub(crate) const BOB_TOKEN: &str = "token-bob";

/// In-memory catalog with fixed playlists and tokens
#[derive(Default)]
pub(crate) struct FakeCatalog {
    playlists: HashMap<String, Playlist>,
    tokens: HashMap<String, UserId>,
    failures: HashMap<String, String>,
}

impl FakeCatalog {
    /// Alice and Bob, plus an empty playlist called `empty`
    pub(crate) fn standard() -> Self {
        Self::default()
            .with_user(ALICE_TOKEN, "alice")
            .with_user(BOB_TOKEN, "bob")
            .with_playlist("empty", "Nothing Here", &[])
    }

    pub(crate) fn with_user(mut self, token: &str, user: &str) -> Self {
        self.tokens.insert(token.to_string(), UserId::new(user));
        self
    }

    pub(crate) fn with_playlist(mut self, id: &str, name: &str, titles: &[&str]) -> Self {
        let tracks = titles
            .iter()
            .map(|title| TrackRequest::new(*title, ["Test Artist"]))
            .collect();
        self.playlists.insert(
            id.to_string(),
            Playlist {
                id: id.to_string(),
                name: name.to_string(),
                tracks,
            },
        );
        self
    }

    /// Make `get_playlist(id)` fail with [`Error::Catalog`]
    pub(crate) fn with_failure(mut self, id: &str, message: &str) -> Self {
        self.failures.insert(id.to_string(), message.to_string());
        self
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    async fn get_playlist(&self, playlist_id: &str, access_token: &str) -> Result<Playlist> {
        self.current_user(access_token).await?;
        if let Some(message) = self.failures.get(playlist_id) {
            return Err(Error::Catalog(message.clone()));
        }
        self.playlists
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| Error::PlaylistNotFound(playlist_id.to_string()))
    }

    async fn current_user(&self, access_token: &str) -> Result<UserId> {
        self.tokens
            .get(access_token)
            .cloned()
            .ok_or_else(|| Error::Unauthorized("invalid access token".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// What [`ScriptedResolver`] does for a given title
#[derive(Clone, Debug)]
pub(crate) enum Behavior {
    /// Write `<title>.mp3` and return it
    Succeed,
    /// Return this error
    Fail(ResolutionError),
    /// Never finish
    Hang,
    /// Panic inside the job run
    Panic,
}

/// Resolver whose outcome is chosen per track title
///
/// Titles without a script succeed. Counts calls and the highest number of
/// calls that were in flight at once.
pub(crate) struct ScriptedResolver {
    behaviors: Mutex<HashMap<String, Behavior>>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedResolver {
    pub(crate) fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep this long before every outcome
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with(self, title: &str, behavior: Behavior) -> Self {
        self.behaviors
            .lock()
            .unwrap()
            .insert(title.to_string(), behavior);
        self
    }

    pub(crate) fn failing(self, title: &str) -> Self {
        self.with(
            title,
            Behavior::Fail(ResolutionError::NotFound {
                query: title.to_string(),
            }),
        )
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl TrackResolver for ScriptedResolver {
    async fn resolve(
        &self,
        track: &TrackRequest,
        output_dir: &Path,
    ) -> std::result::Result<PathBuf, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .get(&track.title)
            .cloned()
            .unwrap_or(Behavior::Succeed);

        match behavior {
            Behavior::Succeed => {
                let path = output_dir.join(format!("{}.mp3", track.title));
                tokio::fs::write(&path, format!("audio for {}", track.title))
                    .await
                    .map_err(|e| ResolutionError::Io(e.to_string()))?;
                Ok(path)
            }
            Behavior::Fail(error) => Err(error),
            Behavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Behavior::Panic => panic!("resolver blew up on {}", track.title),
        }
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities { can_resolve: true }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Fault injected by [`ScriptedStore`] into one `update` call
#[derive(Clone, Copy, Debug)]
pub(crate) enum StoreFault {
    /// Return an error without touching the record
    Fail,
    /// Panic inside the caller's task
    Panic,
}

/// In-memory store that misbehaves on chosen `update` calls
///
/// Updates are numbered from 1 across all jobs.
pub(crate) struct ScriptedStore {
    inner: InMemoryJobStore,
    updates: AtomicUsize,
    faults: Mutex<HashMap<usize, StoreFault>>,
}

impl ScriptedStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: InMemoryJobStore::new(),
            updates: AtomicUsize::new(0),
            faults: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn fault_on(self, nth_update: usize, fault: StoreFault) -> Self {
        self.faults.lock().unwrap().insert(nth_update, fault);
        self
    }
}

impl JobStore for ScriptedStore {
    fn create(&self, owner: UserId, total: u32, artifact_name: String) -> JobId {
        self.inner.create(owner, total, artifact_name)
    }

    fn get(&self, id: &JobId) -> Result<Job> {
        self.inner.get(id)
    }

    fn update(
        &self,
        id: &JobId,
        mutator: &mut dyn FnMut(&mut Job) -> Result<()>,
    ) -> Result<Job> {
        let n = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        let fault = self.faults.lock().unwrap().remove(&n);
        match fault {
            Some(StoreFault::Fail) => Err(Error::Other(format!("store rejected update {n}"))),
            Some(StoreFault::Panic) => panic!("store blew up on update {n}"),
            None => self.inner.update(id, mutator),
        }
    }

    fn delete(&self, id: &JobId) -> Result<Job> {
        self.inner.delete(id)
    }

    fn take_artifact(&self, id: &JobId) -> Result<Artifact> {
        self.inner.take_artifact(id)
    }

    fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Vec<Job> {
        self.inner.purge_finished_before(cutoff)
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Config rooted in `root` with fast retries and short timeouts
pub(crate) fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.download.scratch_dir = root.join("scratch");
    config.download.max_concurrent_jobs = 2;
    config.download.track_concurrency = 2;
    config.download.track_timeout = Duration::from_secs(5);
    config.download.job_retention = None;
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Helper to create a test PlaylistDownloader with the standard fake catalog.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) async fn create_test_downloader(
    catalog: FakeCatalog,
    resolver: Arc<ScriptedResolver>,
) -> (PlaylistDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = create_downloader_with_config(config, catalog, resolver).await;
    (downloader, temp_dir)
}

pub(crate) async fn create_downloader_with_config(
    config: Config,
    catalog: FakeCatalog,
    resolver: Arc<ScriptedResolver>,
) -> PlaylistDownloader {
    PlaylistDownloader::with_parts(
        config,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(catalog),
        resolver,
    )
    .await
    .unwrap()
}

/// Downloader over an injected store, with the default test config
pub(crate) async fn create_downloader_with_store(
    catalog: FakeCatalog,
    resolver: Arc<ScriptedResolver>,
    store: Arc<dyn JobStore>,
) -> (PlaylistDownloader, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = PlaylistDownloader::with_parts(config, store, Arc::new(catalog), resolver)
        .await
        .unwrap();
    (downloader, temp_dir)
}

/// Poll until the job is COMPLETED or FAILED
pub(crate) async fn wait_for_terminal(
    downloader: &PlaylistDownloader,
    id: &JobId,
    user: &UserId,
) -> JobSnapshot {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = downloader.poll(id, user).unwrap();
        if matches!(snapshot.status, Status::Completed | Status::Failed) {
            return snapshot;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {}",
            snapshot.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until the job reports `status`
pub(crate) async fn wait_for_status(
    downloader: &PlaylistDownloader,
    id: &JobId,
    user: &UserId,
    status: Status,
) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while downloader.poll(id, user).unwrap().status != status {
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} never reached {status}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Count entries under `dir` (excluding `dir` itself)
pub(crate) fn entries_under(dir: &Path) -> usize {
    if !dir.exists() {
        return 0;
    }
    walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .count()
}
