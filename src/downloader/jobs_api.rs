//! Caller-facing job operations: submit, poll, retrieve

use super::PlaylistDownloader;
use crate::archive::sanitize_archive_name;
use crate::error::{Error, Result};
use crate::jobs::Artifact;
use crate::types::{Caller, Event, JobId, JobSnapshot, UserId};
use std::sync::atomic::Ordering;

/// Longest playlist id accepted before any catalog call
const MAX_PLAYLIST_ID_LEN: usize = 128;

/// Reject playlist ids that are empty, too long, or contain characters other
/// than ASCII letters, digits, `_` and `-`
pub fn validate_playlist_id(playlist_id: &str) -> Result<()> {
    if playlist_id.is_empty() {
        return Err(Error::Validation("playlist id must not be empty".to_string()));
    }
    if playlist_id.len() > MAX_PLAYLIST_ID_LEN {
        return Err(Error::Validation(format!(
            "playlist id is longer than {} characters",
            MAX_PLAYLIST_ID_LEN
        )));
    }
    if !playlist_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::Validation(format!(
            "playlist id '{}' contains invalid characters",
            playlist_id
        )));
    }
    Ok(())
}

impl PlaylistDownloader {
    /// Start downloading a playlist for `caller`
    ///
    /// The playlist is fetched synchronously so that unknown, empty or
    /// forbidden playlists are reported to the caller right away. Track
    /// resolution runs in the background; the returned id is PENDING or
    /// DOWNLOADING by the time the caller sees it.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for a malformed playlist id
    /// - [`Error::ShuttingDown`] once shutdown has started
    /// - [`Error::EmptyPlaylist`] when the playlist has no tracks
    /// - Any catalog error ([`Error::PlaylistNotFound`], [`Error::Unauthorized`], ...)
    pub async fn submit(&self, playlist_id: &str, caller: &Caller) -> Result<JobId> {
        validate_playlist_id(playlist_id)?;
        self.ensure_accepting()?;

        let playlist = self
            .services
            .catalog
            .get_playlist(playlist_id, &caller.access_token)
            .await?;

        if playlist.tracks.is_empty() {
            return Err(Error::EmptyPlaylist(playlist_id.to_string()));
        }
        let total = u32::try_from(playlist.tracks.len()).map_err(|_| {
            Error::Validation(format!(
                "playlist {} has too many tracks ({})",
                playlist_id,
                playlist.tracks.len()
            ))
        })?;

        // Shutdown may have started while the catalog call was in flight
        self.ensure_accepting()?;

        let job_id = self.store.create(
            caller.user_id.clone(),
            total,
            sanitize_archive_name(&playlist.name),
        );

        tracing::info!(
            job_id = %job_id,
            user = %caller.user_id,
            playlist_id,
            total,
            "Playlist job submitted"
        );

        self.emit_event(Event::Submitted {
            job_id,
            owner: caller.user_id.clone(),
            name: playlist.name,
            total,
        });

        self.spawn_job(job_id, caller.user_id.clone(), playlist.tracks);

        Ok(job_id)
    }

    /// Progress of a job owned by `user`
    ///
    /// # Errors
    ///
    /// [`Error::JobNotFound`] for unknown ids, [`Error::Forbidden`] when the job
    /// belongs to someone else.
    pub fn poll(&self, job_id: &JobId, user: &UserId) -> Result<JobSnapshot> {
        let job = self.store.get(job_id)?;
        if !job.is_owned_by(user) {
            return Err(Error::Forbidden(*job_id));
        }
        Ok(job.snapshot())
    }

    /// Hand out the archive of a COMPLETED job owned by `user`
    ///
    /// A successful retrieval removes the job, so a second call for the same id
    /// fails with [`Error::JobNotFound`].
    ///
    /// # Errors
    ///
    /// - [`Error::JobNotFound`] / [`Error::Forbidden`] as for [`poll`](Self::poll)
    /// - [`Error::NotReady`] for any status other than COMPLETED (a FAILED job
    ///   carries its failure reason)
    pub fn retrieve(&self, job_id: &JobId, user: &UserId) -> Result<Artifact> {
        let job = self.store.get(job_id)?;
        if !job.is_owned_by(user) {
            return Err(Error::Forbidden(*job_id));
        }

        let artifact = self.store.take_artifact(job_id)?;

        tracing::info!(
            job_id = %job_id,
            user = %user,
            size_bytes = artifact.bytes.len(),
            "Archive retrieved"
        );
        self.emit_event(Event::Retrieved {
            job_id: *job_id,
            owner: user.clone(),
        });

        Ok(artifact)
    }

    fn ensure_accepting(&self) -> Result<()> {
        if self.run_state.accepting_new.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::ShuttingDown)
        }
    }
}
