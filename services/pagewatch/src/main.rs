//! Pagewatch CLI
//!
//! Command-line interface for the URL change monitoring service.

use std::path::PathBuf;

use clap::Parser;
use pagewatch::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "pagewatch")]
#[command(about = "URL change monitoring and tracker polling service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Check one tracker by id, print the updated record as JSON, and exit
    #[arg(long, value_name = "TRACKER_ID")]
    check_now: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, check_now={:?}, log_level={:?}",
        args.config,
        args.check_now,
        args.log_level
    );

    let config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(tracker_id) = &args.check_now {
        let tracker = pagewatch::run_single_check(config, tracker_id).await?;
        println!("{}", serde_json::to_string_pretty(&tracker)?);
        return Ok(());
    }

    tracing::info!("Starting pagewatch service");
    tracing::debug!(
        "Trackers: {}, tick: {}s, stagger: {}s",
        config.trackers.len(),
        config.scheduler.tick_seconds,
        config.scheduler.stagger_seconds
    );

    pagewatch::run(config).await?;

    Ok(())
}
