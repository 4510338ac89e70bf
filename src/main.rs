//! livepair command-line interface
//!
//! Turns videos into live-photo pairs: a still image and a short clip that
//! share a content identifier, stored together in an asset library.
//!
//! # Usage
//!
//! ```bash
//! livepair convert holiday.mp4 --quality balanced --library ~/Pictures/live
//! livepair inspect holiday.mp4 --format json
//! livepair verify --image IMG.JPG --clip IMG.MOV
//! ```

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use livepair_cli::adapters::tracing_log::LogLevel;
use livepair_cli::app::DefaultAppContainer;
use livepair_cli::cli::{commands, Cli, Commands};
use livepair_cli::config_initialization::{
    initialize_configuration_hierarchy, log_configuration_summary,
};

/// Exit code for usage and setup errors, as opposed to failed conversions
const EXIT_SETUP_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let (config, sources) =
        initialize_configuration_hierarchy(&cli).context("Invalid configuration")?;
    init_logging(&config.log_level, cli.json_logs)?;

    info!("Starting livepair {}", env!("CARGO_PKG_VERSION"));
    log_configuration_summary(&config, &sources);
    let container = DefaultAppContainer::new(&config).context("Failed to set up converter")?;

    match cli.command {
        Commands::Convert(args) => commands::convert(&container, &config, args).await,
        Commands::Inspect(args) => commands::inspect(&container, args).await,
        Commands::Verify(args) => commands::verify(&container, args).await,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// logs go to stderr so reports on stdout stay parseable.
fn init_logging(level: &str, json: bool) -> Result<()> {
    let level = LogLevel::parse(level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to initialise logging: {}", e))
}
