//! No-op resolver for graceful degradation

use super::traits::{ResolverCapabilities, TrackResolver};
use crate::error::ResolutionError;
use crate::types::TrackRequest;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Resolver used when no audio extractor is available
///
/// Every track fails with [`ResolutionError::Unavailable`], so jobs still run to
/// a FAILED state with a clear reason instead of the service refusing to start.
pub struct NoOpResolver;

#[async_trait]
impl TrackResolver for NoOpResolver {
    async fn resolve(
        &self,
        _track: &TrackRequest,
        _output_dir: &Path,
    ) -> Result<PathBuf, ResolutionError> {
        Err(ResolutionError::Unavailable(
            "track download requires the yt-dlp binary. \
             Configure resolver.ytdlp_path or ensure yt-dlp is in PATH."
                .into(),
        ))
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities { can_resolve: false }
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
