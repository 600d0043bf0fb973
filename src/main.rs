use std::fs::{self, OpenOptions};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::columns::ColumnMap;
use crate::config::{Cli, RunConfig};
use crate::realtor::RealtorClient;

mod columns;
mod config;
mod error;
mod export;
mod fetch;
mod helpers;
mod listing_structs;
mod orchestrator;
mod queries;
mod realtor;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RunConfig::from_cli(Cli::parse())?;

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;

    // `<timestamp> <LEVEL> <message>` lines
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("failed to create {}", config.output_dir.display()))?;

    info!(
        "Fetching {} states, listing types {:?}, {} to {}",
        config.states.len(),
        config.listing_types,
        config.start_date,
        config.end_date
    );

    let columns = Arc::new(ColumnMap::default());
    info!("Exporting up to {} mapped columns per state", columns.len());

    let source = Arc::new(RealtorClient::new(&config.endpoint)?);
    let tasks = orchestrator::build_tasks(&config, columns);
    let summary = orchestrator::run(source, tasks, config.processes).await;

    info!("{}", summary);
    println!("Done. See {} for details.", config.log_file.display());

    Ok(())
}
