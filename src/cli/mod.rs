//! CLI module for livepair
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

/// livepair: turn any video into a linked live-photo pair
///
/// Picks a calm segment of the source, renders a still, tags still and clip
/// with a shared content identifier and stores the pair in an asset library.
#[derive(Parser, Debug)]
#[command(name = "livepair")]
#[command(about = "Convert videos into linked live-photo still and clip pairs")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LIVEPAIR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (default: ./livepair.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert videos into live-photo pairs stored in the library
    Convert(args::ConvertArgs),
    /// Probe a video and check whether it can be converted
    Inspect(args::InspectArgs),
    /// Check that a still and a clip are linked
    Verify(args::VerifyArgs),
}
