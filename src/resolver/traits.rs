//! Traits and types for track resolution

use crate::error::ResolutionError;
use crate::types::TrackRequest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Capabilities of a resolver implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverCapabilities {
    /// Can turn a track request into a local audio file
    pub can_resolve: bool,
}

/// Trait for turning a track description into a local audio file
///
/// Implementations search an external source for the best match, download it
/// and transcode it into the configured audio format. Every failure is reported
/// as a [`ResolutionError`] so the caller can count it and move on; a single
/// track never aborts a job.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::resolver::{TrackResolver, YtDlpResolver};
/// use playlist_dl::TrackRequest;
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let resolver = YtDlpResolver::from_path()
///     .expect("yt-dlp binary not found");
///
/// let track = TrackRequest::new("Blue Monday", ["New Order"]);
/// let file = resolver.resolve(&track, Path::new("/tmp/scratch")).await?;
/// println!("saved to {}", file.display());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TrackResolver: Send + Sync {
    /// Search, download and transcode one track into `output_dir`
    ///
    /// # Returns
    ///
    /// The path of the written audio file. It is always inside `output_dir`.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::NotFound`] if the search had no usable result
    /// - [`ResolutionError::Network`] for transient transport failures (retryable)
    /// - [`ResolutionError::Extraction`] if download or transcoding failed
    /// - [`ResolutionError::Unavailable`] if no extractor exists on this host
    async fn resolve(
        &self,
        track: &TrackRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, ResolutionError>;

    /// Query capabilities of this resolver
    fn capabilities(&self) -> ResolverCapabilities;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
