//! Core downloader implementation split into focused submodules.
//!
//! The `PlaylistDownloader` struct and its methods are organized by domain:
//! - [`jobs_api`] - Submit, poll and retrieve on behalf of a caller
//! - [`download_task`] - Supervised per-job runs (slot, resolve, archive)
//! - [`lifecycle`] - Graceful shutdown
//! - [`retention`] - Expiry of finished jobs nobody retrieved

mod download_task;
mod jobs_api;
mod lifecycle;
mod retention;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use jobs_api::validate_playlist_id;

use crate::catalog::{Catalog, SpotifyCatalog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::jobs::{InMemoryJobStore, JobStore};
use crate::resolver::{TrackResolver, resolver_from_config};
use crate::types::{Capabilities, Event};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Job scheduling and shutdown state
#[derive(Clone)]
pub(crate) struct RunState {
    /// Limits how many jobs resolve tracks at once (max_concurrent_jobs)
    pub(crate) job_slots: Arc<Semaphore>,
    /// Every supervised job run and background service
    pub(crate) tracker: TaskTracker,
    /// Cancelled once by shutdown; job runs hold child tokens
    pub(crate) shutdown_token: CancellationToken,
    /// Flag to indicate whether new jobs are accepted (set to false during shutdown)
    pub(crate) accepting_new: Arc<AtomicBool>,
}

/// External systems a job talks to
#[derive(Clone)]
pub(crate) struct Services {
    /// Playlist source and token validation
    pub(crate) catalog: Arc<dyn Catalog>,
    /// Track search and audio extraction
    pub(crate) resolver: Arc<dyn TrackResolver>,
}

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PlaylistDownloader {
    /// Job registry shared by request handlers and job runs
    pub(crate) store: Arc<dyn JobStore>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Catalog and resolver
    pub(crate) services: Services,
    /// Scheduling and shutdown state
    pub(crate) run_state: RunState,
}

impl PlaylistDownloader {
    /// Create a downloader wired to the production components
    ///
    /// This initializes:
    /// - The scratch directory parent
    /// - A [`SpotifyCatalog`] client
    /// - The yt-dlp resolver, or the no-op resolver when yt-dlp is missing
    /// - An empty in-memory job store
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let catalog: Arc<dyn Catalog> =
            Arc::new(SpotifyCatalog::new(&config.catalog, config.retry.clone())?);
        let resolver = resolver_from_config(&config.resolver);
        Self::with_parts(config, Arc::new(InMemoryJobStore::new()), catalog, resolver).await
    }

    /// Create a downloader from explicit components
    ///
    /// Starts the retention sweeper when `download.job_retention` is set.
    pub async fn with_parts(
        config: Config,
        store: Arc<dyn JobStore>,
        catalog: Arc<dyn Catalog>,
        resolver: Arc<dyn TrackResolver>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.download.scratch_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create scratch directory '{}': {}",
                        config.download.scratch_dir.display(),
                        e
                    ),
                ))
            })?;

        // Create broadcast channel with buffer size of 1000 events
        let (event_tx, _rx) = broadcast::channel(1000);

        let run_state = RunState {
            job_slots: Arc::new(Semaphore::new(config.download.max_concurrent_jobs)),
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
            accepting_new: Arc::new(AtomicBool::new(true)),
        };

        tracing::info!(
            catalog = catalog.name(),
            resolver = resolver.name(),
            max_concurrent_jobs = config.download.max_concurrent_jobs,
            track_concurrency = config.download.track_concurrency,
            "Playlist downloader initialized"
        );

        let downloader = Self {
            store,
            event_tx,
            config: Arc::new(config),
            services: Services { catalog, resolver },
            run_state,
        };

        downloader.start_retention_sweeper();

        Ok(downloader)
    }

    /// Subscribe to job events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    /// A subscriber that falls behind by more than 1000 events receives
    /// `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Catalog used to validate caller tokens
    pub fn catalog(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.services.catalog)
    }

    /// Query what the running service can do
    pub fn capabilities(&self) -> Capabilities {
        let resolver = &self.services.resolver;
        Capabilities {
            resolver: resolver.name().to_string(),
            can_resolve: resolver.capabilities().can_resolve,
            catalog: self.services.catalog.name().to_string(),
        }
    }

    /// Jobs currently held in the store, in any state
    pub fn job_count(&self) -> usize {
        self.store.len()
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}
