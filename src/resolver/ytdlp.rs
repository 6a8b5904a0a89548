//! CLI-based resolver using the external yt-dlp binary

use super::parser::{ExitStatus, parse_ytdlp_output};
use super::traits::{ResolverCapabilities, TrackResolver};
use crate::error::ResolutionError;
use crate::types::TrackRequest;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Resolver that shells out to `yt-dlp`
///
/// Each call runs a single `ytsearch1:` query, keeps only the best audio stream
/// and converts it with the extractor's ffmpeg post-processor. The child process
/// is killed if the returned future is dropped, so a per-track timeout around
/// [`TrackResolver::resolve`] also stops the download.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::resolver::YtDlpResolver;
/// use std::path::PathBuf;
///
/// // Explicit binary, opus at the extractor's best VBR quality
/// let resolver = YtDlpResolver::new(PathBuf::from("/usr/local/bin/yt-dlp"))
///     .with_audio("opus", "0");
///
/// // Or auto-discover from PATH
/// let resolver = YtDlpResolver::from_path().expect("yt-dlp not found in PATH");
/// ```
pub struct YtDlpResolver {
    binary_path: PathBuf,
    audio_format: String,
    audio_quality: String,
}

impl YtDlpResolver {
    /// Create a resolver with an explicit binary path (mp3 at 192K)
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            audio_format: "mp3".to_string(),
            audio_quality: "192K".to_string(),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Override the target codec and quality
    pub fn with_audio(mut self, format: impl Into<String>, quality: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self.audio_quality = quality.into();
        self
    }

    /// Path of the binary this resolver runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Arguments for one invocation
    fn command_args(&self, query: &str, output_dir: &Path) -> Vec<OsString> {
        let template = output_dir.join("%(title)s.%(ext)s");
        vec![
            format!("ytsearch1:{query}").into(),
            "-f".into(),
            "bestaudio/best".into(),
            "-x".into(),
            "--audio-format".into(),
            self.audio_format.clone().into(),
            "--audio-quality".into(),
            self.audio_quality.clone().into(),
            "--no-playlist".into(),
            "--quiet".into(),
            "--no-progress".into(),
            "--no-warnings".into(),
            "--print".into(),
            "after_move:filepath".into(),
            "-o".into(),
            template.into_os_string(),
        ]
    }
}

#[async_trait]
impl TrackResolver for YtDlpResolver {
    async fn resolve(
        &self,
        track: &TrackRequest,
        output_dir: &Path,
    ) -> Result<PathBuf, ResolutionError> {
        let query = track.search_query();
        tracing::debug!(query = %query, dir = %output_dir.display(), "running yt-dlp");

        let output = Command::new(&self.binary_path)
            .args(self.command_args(&query, output_dir))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ResolutionError::Unavailable(format!(
                        "failed to execute {}: {}",
                        self.binary_path.display(),
                        e
                    ))
                } else {
                    ResolutionError::Io(format!("failed to execute yt-dlp: {}", e))
                }
            })?;

        let path = parse_ytdlp_output(
            &query,
            &output.stdout,
            &output.stderr,
            ExitStatus::from(output.status.success()),
        )?;

        // Relative paths are relative to the output template's directory
        let path = if path.is_relative() {
            output_dir.join(path)
        } else {
            path
        };

        match tokio::fs::try_exists(&path).await {
            Ok(true) => Ok(path),
            Ok(false) => Err(ResolutionError::Extraction {
                query,
                reason: format!("reported file {} does not exist", path.display()),
            }),
            Err(e) => Err(ResolutionError::Io(format!(
                "failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn capabilities(&self) -> ResolverCapabilities {
        ResolverCapabilities { can_resolve: true }
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}
