//! livepair library
//!
//! Converts a video into a live-photo pair: a still image and a short clip
//! linked by a shared content identifier. The pipeline probes the source,
//! picks its calmest segment, renders and tags a still, exports a tagged clip
//! and commits both to an asset store with a fallback chain.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod pairing;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{QualityProfile, SourceVideo};
pub use error::{MediaError, MediaResult};
