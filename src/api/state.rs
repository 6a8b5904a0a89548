//! Application state for the API server

use crate::{Config, PlaylistDownloader};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The downloader serving job requests
    pub downloader: Arc<PlaylistDownloader>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(downloader: Arc<PlaylistDownloader>, config: Arc<Config>) -> Self {
        Self { downloader, config }
    }
}
