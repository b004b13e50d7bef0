//! ytcast - cast YouTube videos to your smart TV.
//!
//! Discovers DIAL devices on the local network, wakes the selected one if
//! needed, launches the YouTube app on it and plays (or queues) videos
//! through a YouTube Lounge session.

mod cast;
mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use ytcast_core::{DialClient, LoungeApi};

use crate::cast::{CastOptions, default_display_name};
use crate::config::AppConfig;

/// Cast YouTube videos to your smart TV.
#[derive(Parser, Debug)]
#[command(name = "ytcast")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Search (discover) devices on the network and list them.
    #[arg(short, long)]
    search: bool,

    /// Select device by substring of name, host (ip) or unique service name.
    #[arg(short, long, env = "YTCAST_DEVICE")]
    name: Option<String>,

    /// Search timeout in seconds (min 1, max 5; overrides config file).
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pair with the TV using the code shown in its YouTube settings instead
    /// of discovering it.
    #[arg(long, value_name = "CODE")]
    pair: Option<String>,

    /// Add the videos to the queue instead of replacing the playlist.
    #[arg(short, long)]
    add: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "warn", env = "YTCAST_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Videos to play (ids or URLs). Read from stdin if none or "-".
    videos: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("ytcast v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        AppConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(timeout) = args.timeout {
        config.search_timeout = timeout;
    }

    let core_config = config.to_core_config();
    let client = DialClient::new(core_config.clone());
    let lounge = LoungeApi::new(&core_config);

    let options = CastOptions {
        launch_timeout: Duration::from_secs(config.launch_timeout),
        launch_check_interval: Duration::from_millis(config.launch_check_interval_ms),
        display_name: config
            .display_name
            .clone()
            .unwrap_or_else(default_display_name),
        add: args.add,
    };

    if args.search {
        let devices = cast::discover_devices(&client, config.search_window())
            .await
            .context("Discover")?;
        if devices.is_empty() {
            bail!("no device found");
        }
        for device in &devices {
            println!("{}", cast::device_line(device));
        }
        return Ok(());
    }

    if let Some(code) = &args.pair {
        let videos = read_videos(args.videos).await?;
        return cast::cast_with_code(&lounge, code, &videos, &options)
            .await
            .context("Pairing");
    }

    let Some(name) = args.name.as_deref() else {
        bail!("no device selected (use -n NAME, or -s to list devices)");
    };
    let videos = read_videos(args.videos).await?;

    let devices = cast::discover_devices(&client, config.search_window())
        .await
        .context("Discover")?;
    if devices.is_empty() {
        bail!("no device found");
    }
    let selected = match cast::select_device(&devices, name) {
        Ok(selected) => selected,
        Err(e) => {
            for device in &devices {
                eprintln!("{}", cast::device_line(device));
            }
            return Err(e.into());
        }
    };

    let mut selected = selected.clone();
    cast::cast_to_device(&client, &lounge, &mut selected, &videos, &options)
        .await
        .with_context(|| format!("{:?}", selected.friendly_name))?;

    log::info!("Done");
    Ok(())
}

/// Returns `videos`, or the non-empty lines of stdin if none (or only "-")
/// were given.
async fn read_videos(videos: Vec<String>) -> Result<Vec<String>> {
    if !videos.is_empty() && videos != ["-"] {
        return Ok(videos);
    }

    log::info!("Reading videos from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut videos = Vec::new();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if !line.is_empty() {
            videos.push(line.to_string());
        }
    }

    if videos.is_empty() {
        bail!("no video to play");
    }
    Ok(videos)
}
