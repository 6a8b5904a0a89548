//! Music catalog access
//!
//! The catalog is the music service that owns playlists and user accounts. The
//! crate needs two things from it: a playlist's track list and the identity
//! behind an access token. [`SpotifyCatalog`] implements both against the
//! Spotify Web API; tests substitute their own [`Catalog`].

mod spotify;

pub use spotify::SpotifyCatalog;

use crate::error::Result;
use crate::types::{Playlist, UserId};
use async_trait::async_trait;

/// Read access to the music catalog on behalf of a caller
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch a playlist snapshot with every track, in playlist order
    ///
    /// # Errors
    ///
    /// - [`Error::PlaylistNotFound`](crate::Error::PlaylistNotFound) if the id is unknown
    /// - [`Error::Unauthorized`](crate::Error::Unauthorized) if the token is rejected
    /// - [`Error::Catalog`](crate::Error::Catalog) for any other upstream failure
    async fn get_playlist(&self, playlist_id: &str, access_token: &str) -> Result<Playlist>;

    /// Resolve the user an access token belongs to
    async fn current_user(&self, access_token: &str) -> Result<UserId>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
