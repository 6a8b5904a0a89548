//! Fixtures: a mock catalog server and a file-writing resolver

use async_trait::async_trait;
use playlist_dl::catalog::{Catalog, SpotifyCatalog};
use playlist_dl::config::{CatalogConfig, RetryConfig};
use playlist_dl::resolver::{ResolverCapabilities, TrackResolver};
use playlist_dl::{
    Config, Event, InMemoryJobStore, JobId, PlaylistDownloader, ResolutionError, TrackRequest,
};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Access token the mock catalog maps to user `alice`
pub const ALICE_TOKEN: &str = "alice-token";
/// Access token the mock catalog maps to user `bob`
pub const BOB_TOKEN: &str = "bob-token";

/// Start a mock catalog that knows `alice` and `bob`
///
/// Unknown tokens fall through to wiremock's default 404, which the client
/// reports as a catalog error, so tests only ever send known tokens to `/me`
/// or expect a non-2xx status.
pub async fn start_catalog() -> MockServer {
    // Non-pooled, so dropping the server actually closes the listener
    let server = MockServer::builder().start().await;
    for (token, user) in [(ALICE_TOKEN, "alice"), (BOB_TOKEN, "bob")] {
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": user })))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(u8::MAX)
        .mount(&server)
        .await;
    server
}

/// Register a single-page playlist whose tracks are all by "Test Artist"
pub async fn mount_playlist(server: &MockServer, id: &str, name: &str, titles: &[&str]) {
    let items: Vec<_> = titles
        .iter()
        .map(|title| json!({ "track": { "name": title, "artists": [{ "name": "Test Artist" }] } }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/playlists/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": name,
            "tracks": { "items": items, "next": null }
        })))
        .mount(server)
        .await;
}

/// Resolver that writes `<title>.mp3` unless the title is listed as missing
pub struct FileResolver {
    missing: HashSet<String>,
    delay: Duration,
}

impl FileResolver {
    pub fn new() -> Self {
        Self {
            missing: HashSet::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn missing(mut self, title: &str) -> Self {
        self.missing.insert(title.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl TrackResolver for FileResolver {
    async fn resolve(
        &self,
        track: &TrackRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, ResolutionError> {
        tokio::time::sleep(self.delay).await;
        if self.missing.contains(&track.title) {
            return Err(ResolutionError::NotFound {
                query: track.search_query(),
            });
        }
        let path = output_dir.join(format!("{}.mp3", track.title));
        tokio::fs::write(&path, track.search_query())
            .await
            .map_err(|e| ResolutionError::Io(e.to_string()))?;
        Ok(path)
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities { can_resolve: true }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Config rooted in `root`, with fast retries and no retention sweeper
pub fn test_config(root: &Path, catalog: &MockServer) -> Config {
    let mut config = Config::default();
    config.download.scratch_dir = root.join("scratch");
    config.download.track_timeout = Duration::from_secs(5);
    config.download.job_retention = None;
    config.catalog = CatalogConfig {
        base_url: catalog.uri(),
        request_timeout: Duration::from_secs(5),
    };
    config.retry = RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Downloader wired to the mock catalog and the given resolver
pub async fn create_downloader(
    catalog: &MockServer,
    resolver: FileResolver,
) -> (Arc<PlaylistDownloader>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
    let config = test_config(temp_dir.path(), catalog);
    let spotify: Arc<dyn Catalog> = Arc::new(
        SpotifyCatalog::new(&config.catalog, config.retry.clone())
            .expect("failed to build catalog client"),
    );
    let downloader = PlaylistDownloader::with_parts(
        config,
        Arc::new(InMemoryJobStore::new()),
        spotify,
        Arc::new(resolver),
    )
    .await
    .expect("failed to create downloader");
    (Arc::new(downloader), temp_dir)
}

/// How a job ended
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Archive built
    Completed,
    /// Job failed with this reason
    Failed(String),
    /// No terminal event in time
    Timeout,
}

/// Wait for the terminal event of `id` on a receiver subscribed before submission
pub async fn wait_for_terminal(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::Completed { job_id, .. }) if job_id == id => {
                    return WaitResult::Completed;
                }
                Ok(Event::Failed { job_id, reason, .. }) if job_id == id => {
                    return WaitResult::Failed(reason);
                }
                Ok(_) => continue,
                Err(_) => return WaitResult::Timeout,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}
