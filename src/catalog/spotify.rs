//! Spotify Web API catalog client

use super::Catalog;
use crate::config::{CatalogConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::retry::retry_with_backoff;
use crate::types::{Playlist, TrackRequest, UserId};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Name used when the catalog returns a playlist without one
const DEFAULT_PLAYLIST_NAME: &str = "spotify_playlist";

/// Upper bound on followed `next` links for one playlist
const MAX_PAGES: usize = 1000;

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    #[serde(default)]
    name: Option<String>,
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    // null for tracks removed from the catalog
    #[serde(default)]
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistObject>,
}

#[derive(Debug, Deserialize)]
struct ArtistObject {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
}

impl TrackPage {
    fn into_tracks(self, out: &mut Vec<TrackRequest>) -> Option<String> {
        out.extend(self.items.into_iter().filter_map(|item| {
            item.track
                .map(|t| TrackRequest::new(t.name, t.artists.into_iter().map(|a| a.name)))
        }));
        self.next
    }
}

/// [`Catalog`] backed by the Spotify Web API
///
/// Requests carry the caller's bearer token. Timeouts, connection failures,
/// 5xx responses and 429 rate limiting are retried per [`RetryConfig`].
pub struct SpotifyCatalog {
    http_client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl SpotifyCatalog {
    /// Create a client for the configured API base URL
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: &CatalogConfig, retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("playlist-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// GET `url` and decode the JSON body, retrying transient failures
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
        playlist_id: Option<&str>,
    ) -> Result<T> {
        retry_with_backoff(&self.retry, move || async move {
            let response = self
                .http_client
                .get(url)
                .bearer_auth(access_token)
                .send()
                .await?;

            let status = response.status();
            match status {
                s if s.is_success() => {}
                StatusCode::UNAUTHORIZED => {
                    return Err(Error::Unauthorized(
                        "catalog rejected the access token".into(),
                    ));
                }
                StatusCode::NOT_FOUND => {
                    if let Some(id) = playlist_id {
                        return Err(Error::PlaylistNotFound(id.to_string()));
                    }
                    return Err(Error::Catalog(format!("HTTP 404: {}", url)));
                }
                s => {
                    return Err(Error::Catalog(format!("HTTP {}: {}", s.as_u16(), url)));
                }
            }

            response
                .json::<T>()
                .await
                .map_err(|e| Error::Catalog(format!("invalid response from {}: {}", url, e)))
        })
        .await
        .map_err(|e| match e {
            // Transport failures still retry above; callers see them as catalog errors
            Error::Network(e) => Error::Catalog(format!("request to {} failed: {}", url, e)),
            other => other,
        })
    }
}

#[async_trait]
impl Catalog for SpotifyCatalog {
    async fn get_playlist(&self, playlist_id: &str, access_token: &str) -> Result<Playlist> {
        let url = format!(
            "{}/playlists/{}",
            self.base_url,
            urlencoding::encode(playlist_id)
        );
        debug!(playlist_id, "fetching playlist");

        let first: PlaylistResponse = self
            .get_json(&url, access_token, Some(playlist_id))
            .await?;

        let name = first
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLAYLIST_NAME.to_string());

        let mut tracks = Vec::new();
        let mut next = first.tracks.into_tracks(&mut tracks);
        let mut pages = 1;

        while let Some(page_url) = next {
            if pages >= MAX_PAGES {
                return Err(Error::Catalog(format!(
                    "playlist {} has more than {} pages of tracks",
                    playlist_id, MAX_PAGES
                )));
            }
            let page: TrackPage = self
                .get_json(&page_url, access_token, Some(playlist_id))
                .await?;
            next = page.into_tracks(&mut tracks);
            pages += 1;
        }

        info!(
            playlist_id,
            name = %name,
            tracks = tracks.len(),
            pages,
            "fetched playlist"
        );

        Ok(Playlist {
            id: playlist_id.to_string(),
            name,
            tracks,
        })
    }

    async fn current_user(&self, access_token: &str) -> Result<UserId> {
        let url = format!("{}/me", self.base_url);
        let user: UserResponse = self.get_json(&url, access_token, None).await?;
        Ok(UserId::new(user.id))
    }

    fn name(&self) -> &'static str {
        "spotify"
    }
}
