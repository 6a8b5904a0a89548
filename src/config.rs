//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::Path, path::PathBuf, time::Duration};
use utoipa::ToSchema;

/// Job execution settings (scratch space, concurrency, timeouts, retention)
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Parent directory for per-job scratch directories (default: system temp dir)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,

    /// Maximum jobs resolving tracks at the same time (default: 2)
    ///
    /// Jobs beyond this limit stay PENDING until a slot frees up.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Maximum tracks of one job resolved in parallel (default: 4, 1 = sequential)
    #[serde(default = "default_track_concurrency")]
    pub track_concurrency: usize,

    /// Time budget for a single track, including retries (default: 300 seconds)
    #[serde(default = "default_track_timeout", with = "duration_serde")]
    pub track_timeout: Duration,

    /// How long finished jobs are kept if nobody retrieves them (default: 3600 seconds)
    ///
    /// None keeps them until the process exits.
    #[serde(
        default = "default_job_retention",
        with = "optional_duration_serde"
    )]
    pub job_retention: Option<Duration>,

    /// How often the retention sweeper runs (default: 60 seconds)
    #[serde(default = "default_sweep_interval", with = "duration_serde")]
    pub retention_sweep_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            track_concurrency: default_track_concurrency(),
            track_timeout: default_track_timeout(),
            job_retention: default_job_retention(),
            retention_sweep_interval: default_sweep_interval(),
        }
    }
}

/// Audio extractor (yt-dlp) settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolverConfig {
    /// Path to the yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Whether to search PATH for yt-dlp if no explicit path is set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Target audio codec (default: "mp3")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,

    /// Target audio quality passed to the extractor (default: "192K")
    #[serde(default = "default_audio_quality")]
    pub audio_quality: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            search_path: true,
            audio_format: default_audio_format(),
            audio_quality: default_audio_quality(),
        }
    }
}

/// Music catalog API settings
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CatalogConfig {
    /// Base URL of the catalog web API (default: "https://api.spotify.com/v1")
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Timeout for a single catalog request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:8000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Main configuration for PlaylistDownloader
///
/// Every section and field has a default, so `{}` is a valid configuration file.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Job execution settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Audio extractor settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Music catalog settings
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Retry policy for catalog calls and transient track failures
    #[serde(default)]
    pub retry: RetryConfig,

    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    /// Load a configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.download.max_concurrent_jobs == 0 {
            return Err(config_error(
                "max_concurrent_jobs must be at least 1",
                "download.max_concurrent_jobs",
            ));
        }
        if self.download.track_concurrency == 0 {
            return Err(config_error(
                "track_concurrency must be at least 1",
                "download.track_concurrency",
            ));
        }
        if self.download.track_timeout.is_zero() {
            return Err(config_error(
                "track_timeout must be greater than zero",
                "download.track_timeout",
            ));
        }
        if self.download.retention_sweep_interval.is_zero() {
            return Err(config_error(
                "retention_sweep_interval must be greater than zero",
                "download.retention_sweep_interval",
            ));
        }
        if self.resolver.audio_format.trim().is_empty() {
            return Err(config_error(
                "audio_format must not be empty",
                "resolver.audio_format",
            ));
        }
        if url::Url::parse(&self.catalog.base_url).is_err() {
            return Err(config_error(
                "base_url is not a valid URL",
                "catalog.base_url",
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(config_error(
                "backoff_multiplier must be at least 1.0",
                "retry.backoff_multiplier",
            ));
        }
        Ok(())
    }
}

fn config_error(message: &str, key: &str) -> Error {
    Error::Config {
        message: message.to_string(),
        key: Some(key.to_string()),
    }
}

fn default_scratch_dir() -> PathBuf {
    std::env::temp_dir().join("playlist-dl")
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_track_concurrency() -> usize {
    4
}

fn default_track_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_job_retention() -> Option<Duration> {
    Some(Duration::from_secs(3600))
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_true() -> bool {
    true
}

fn default_audio_format() -> String {
    "mp3".to_string()
}

fn default_audio_quality() -> String {
    "192K".to_string()
}

fn default_catalog_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
