//! # playlist-dl
//!
//! Asynchronous playlist-to-zip download service.
//!
//! A caller submits a catalog playlist id; the service fetches the track list,
//! resolves every track to an audio file through an external extractor
//! (yt-dlp), packs the results into a zip archive and hands that archive out
//! exactly once. Progress is polled per job or followed as events.
//!
//! ## Building Blocks
//!
//! - [`PlaylistDownloader`] - submit, poll, retrieve, shutdown
//! - [`catalog::Catalog`] - playlist and identity source ([`catalog::SpotifyCatalog`])
//! - [`resolver::TrackResolver`] - track search and audio extraction ([`resolver::YtDlpResolver`])
//! - [`jobs::JobStore`] - job registry ([`jobs::InMemoryJobStore`])
//! - [`api`] - axum REST API
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{Caller, Config, PlaylistDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = PlaylistDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let caller = Caller::new("spotify-user", "access-token");
//!     let job_id = downloader.submit("37i9dQZF1DXcBWIGoYBM5M", &caller).await?;
//!     println!("{:?}", downloader.poll(&job_id, &caller.user_id)?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Zip archive assembly
pub mod archive;
/// Music catalog client
pub mod catalog;
/// Configuration types
pub mod config;
/// Core downloader implementation (decomposed into focused submodules)
pub mod downloader;
/// Error types
pub mod error;
/// Job records, state machine and registry
pub mod jobs;
/// Track resolution through an external audio extractor
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use catalog::{Catalog, SpotifyCatalog};
pub use config::Config;
pub use downloader::PlaylistDownloader;
pub use error::{
    ApiError, BuildError, Error, ErrorDetail, ResolutionError, Result, ToHttpStatus,
};
pub use jobs::{Artifact, InMemoryJobStore, Job, JobStore};
pub use resolver::{NoOpResolver, TrackResolver, YtDlpResolver};
pub use types::{
    Caller, Capabilities, Event, JobId, JobSnapshot, Playlist, Status, SubmitResponse,
    TrackRequest, UserId,
};

/// Helper function to run the downloader with graceful signal handling.
///
/// Waits for a termination signal and then calls the downloader's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{Config, PlaylistDownloader, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = PlaylistDownloader::new(Config::default()).await?;
///     let _api = downloader.spawn_api_server();
///
///     // Run with automatic signal handling
///     run_with_shutdown(downloader).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: PlaylistDownloader) -> Result<()> {
    wait_for_signal().await;
    downloader.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Set up signal handlers - these may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
