//! Command-line argument definitions

use std::path::PathBuf;

use clap::{Args, ValueEnum};

/// Arguments for the convert command
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input videos; directories are searched for video files
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Quality profile (high, balanced, fast, custom)
    #[arg(short, long)]
    pub quality: Option<String>,

    /// Asset library receiving the pairs
    #[arg(short, long)]
    pub library: Option<PathBuf>,

    /// Maximum number of videos converted at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Drop the audio track from clips
    #[arg(long)]
    pub no_audio: bool,

    /// Number of still candidates scored per video
    #[arg(long)]
    pub still_candidates: Option<usize>,
}

/// Report format of the inspect command
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input video file path
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Still image of the pair
    #[arg(long)]
    pub image: PathBuf,

    /// Clip of the pair
    #[arg(long)]
    pub clip: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
