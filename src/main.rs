//! playlist-dl service binary
//!
//! Environment:
//! - `PLAYLIST_DL_CONFIG` - path to a JSON config file (defaults apply when unset)
//! - `PLAYLIST_DL_BIND` - overrides `api.bind_address`
//! - `RUST_LOG` - tracing filter

use playlist_dl::{Config, PlaylistDownloader, run_with_shutdown};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "playlist_dl=info,tower_http=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match std::env::var_os("PLAYLIST_DL_CONFIG") {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Ok(bind) = std::env::var("PLAYLIST_DL_BIND") {
        config.api.bind_address = bind
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid PLAYLIST_DL_BIND '{bind}': {e}"))?;
    }

    let downloader = PlaylistDownloader::new(config).await?;
    let api = downloader.spawn_api_server();

    run_with_shutdown(downloader).await?;

    // The server exits on its own once the shutdown token fires
    api.await??;

    tracing::info!("playlist-dl stopped");
    Ok(())
}
