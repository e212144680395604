//! Drive Backup - Main entry point
//!
//! Archives the configured paths, then uploads the declared files to Drive.

use anyhow::Result;
use clap::Parser;
use drive_backup::{config::Config, drive, executor::BackupExecutor, utils};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match args.config {
        Some(config_path) => Config::from_file(&config_path)?,
        None => Config::default(),
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting drive-backup v{}", env!("CARGO_PKG_VERSION"));

    let executor = BackupExecutor::new(config);

    // Archive must be complete before anything touches Drive
    executor.archive().await?;

    let client = drive::auth::authorize(&executor.config().drive).await?;
    executor.upload(Arc::new(client)).await?;

    Ok(())
}
