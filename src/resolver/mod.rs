//! Track resolution
//!
//! Turns a [`TrackRequest`](crate::types::TrackRequest) into a local audio file.
//! The core abstraction is the [`TrackResolver`] trait; two implementations ship
//! with the crate:
//!
//! - [`YtDlpResolver`]: drives the external `yt-dlp` binary
//! - [`NoOpResolver`]: stub used when no extractor is installed
//!
//! [`resolver_from_config`] picks one according to [`ResolverConfig`].

mod noop;
pub mod parser;
mod traits;
mod ytdlp;

pub use noop::NoOpResolver;
pub use traits::{ResolverCapabilities, TrackResolver};
pub use ytdlp::YtDlpResolver;

use crate::config::ResolverConfig;
use std::sync::Arc;

/// Build the resolver described by the configuration
///
/// An explicit `ytdlp_path` wins; otherwise PATH is searched when `search_path`
/// is set. Without a binary the [`NoOpResolver`] is returned, so every job fails
/// with a clear reason instead of the service refusing to start.
pub fn resolver_from_config(config: &ResolverConfig) -> Arc<dyn TrackResolver> {
    let cli = if let Some(ref path) = config.ytdlp_path {
        Some(YtDlpResolver::new(path.clone()))
    } else if config.search_path {
        YtDlpResolver::from_path()
    } else {
        None
    };

    let resolver: Arc<dyn TrackResolver> = match cli {
        Some(resolver) => Arc::new(
            resolver.with_audio(config.audio_format.clone(), config.audio_quality.clone()),
        ),
        None => {
            tracing::warn!("yt-dlp not found; every track will fail until it is installed");
            Arc::new(NoOpResolver)
        }
    };

    tracing::info!(
        resolver = resolver.name(),
        can_resolve = resolver.capabilities().can_resolve,
        "Track resolver initialized"
    );
    resolver
}
