mod auth;
mod core;
mod error;
mod serial;
mod spotify;

use anyhow::Context;
use jukebox_proto::config::Config;
use jukebox_proto::platform;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn init_logging() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = platform::log_path();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Console for whoever runs the bridge, file for later inspection
    let console_layer = tracing_subscriber::fmt::layer();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,jukebox_daemon=debug")),
        )
        .init();

    info!("Log file: {:?}", log_path);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let config = Config::load().context("loading config")?;
    info!("Config loaded from: {:?}", Config::config_path());

    if !config.spotify.has_credentials() {
        anyhow::bail!(
            "Spotify client credentials missing: set {} and {} or fill [spotify] in {:?}",
            jukebox_proto::config::ENV_CLIENT_ID,
            jukebox_proto::config::ENV_CLIENT_SECRET,
            Config::config_path()
        );
    }

    let http = spotify::http_client()?;
    let cache_path = platform::token_cache_path();
    let token = auth::load_or_authorize(&http, &config.spotify, &cache_path)
        .await
        .context("authorizing with Spotify")?;
    let api = spotify::SpotifyClient::new(config.spotify.clone(), token, Some(cache_path))?;

    let link = match serial::SerialLink::open(&config.serial) {
        Ok(link) => link,
        Err(e) => {
            serial::log_available_ports();
            return Err(e).context("opening card reader");
        }
    };

    let bridge = core::Bridge::new(link, api, core::BridgeSettings::from_config(&config));
    let result = bridge.run(shutdown_signal()).await;
    info!("Bridge stopped");
    result
}
