//! ScaleLink command line monitor
//!
//! Starts the configured scale driver and prints readings as they arrive.
//!
//! Usage:
//!   scalelink [--config FILE] [--port PORT] [--baud RATE] [--demo] [--once] [--json]

use anyhow::{Context, Result};
use clap::Parser;
use scalelink_core::config::DriverConfig;
use scalelink_core::driver::DriverKind;
use scalelink_core::reading::Reading;
use scalelink_core::status::{DriverRegistry, ScaleMonitor};
use scalelink_core::store::ReadingStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Registry name of the scale started by this tool
const SCALE_NAME: &str = "scale";

#[derive(Parser, Debug)]
#[command(name = "scalelink")]
#[command(about = "Poll a serial weighing scale and print its readings")]
#[command(version)]
struct Cli {
    /// JSON config file with a "scaleDriver" section
    #[arg(short, long, env = "SCALELINK_CONFIG")]
    config: Option<PathBuf>,

    /// Serial port, overrides the config file
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overrides the config file
    #[arg(short, long)]
    baud: Option<u32>,

    /// Use the simulated scale instead of a serial port
    #[arg(long)]
    demo: bool,

    /// Print the status report after the first poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Print readings as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(cli: &Cli) -> Result<DriverConfig> {
    let mut config = match &cli.config {
        Some(path) => DriverConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => DriverConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    if cli.demo {
        config.driver = DriverKind::Demo;
    }
    config.validate()?;
    Ok(config)
}

fn format_reading(reading: &Reading, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(reading)?);
    }
    let value = reading
        .value
        .map(|v| format!("{:.3}", v))
        .unwrap_or_else(|| "-".to_string());
    Ok(format!(
        "{} {:>10} {}",
        reading.timestamp.format("%H:%M:%S%.3f"),
        value,
        reading.status
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let monitor = ScaleMonitor::start(&config).context("starting poll thread")?;
    let mut store = monitor.store();

    let mut registry = DriverRegistry::new();
    registry.insert(SCALE_NAME, monitor);

    if cli.once {
        // First publish comes from the first cycle, successful or not
        let wait = config.poll_interval() + Duration::from_secs(3);
        if tokio::time::timeout(wait, store.changed()).await.is_err() {
            tracing::warn!("no poll cycle completed within {:?}", wait);
        }
        println!("{}", serde_json::to_string_pretty(&registry.status_report())?);
    } else {
        watch_readings(&mut store, cli.json).await?;
    }

    // Stopping joins the poll thread, which may be inside a 1 s serial read
    tokio::task::spawn_blocking(move || registry.stop_all()).await?;
    Ok(())
}

async fn watch_readings(store: &mut ReadingStore, json: bool) -> Result<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
            next = store.changed() => match next {
                Some(reading) => println!("{}", format_reading(&reading, json)?),
                None => {
                    tracing::error!("poll loop exited");
                    break;
                }
            }
        }
    }
    Ok(())
}
