// Domain errors - Closed failure taxonomy for conversion jobs

use std::fmt;

use serde::Serialize;
use thiserror::Error;

pub mod classifier;

pub use classifier::{ErrorClassifier, ErrorReport, Phase, Severity};

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Access to the asset store (or an input) was refused
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// Source file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Source file is too small to hold a video
    #[error("File too small: {0}")]
    FileTooSmall(String),
    /// Source duration is below the live-photo minimum
    #[error("Video too short: {0}")]
    VideoTooShort(String),
    /// Container has no video track
    #[error("No video track: {0}")]
    NoVideoTrack(String),
    /// Container cannot be opened or parsed
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Clip export failed
    #[error("Export failed: {0}")]
    ExportFailed(String),
    /// Still image could not be rendered or tagged
    #[error("Image processing failed: {0}")]
    ImageProcessingFailed(String),
    /// Every persistence tier was rejected by the store
    #[error("Save failed: {0}")]
    SaveFailed(String),
    /// Files for the final persistence tier could not be produced
    #[error("Creation failed: {0}")]
    CreationFailed(String),
    /// Job was cancelled between phases
    #[error("Cancelled: {0}")]
    Cancelled(String),
    /// Anything else
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Discriminant of [`DomainError`] without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    PermissionDenied,
    FileNotFound,
    FileTooSmall,
    VideoTooShort,
    NoVideoTrack,
    InvalidInput,
    ExportFailed,
    ImageProcessingFailed,
    SaveFailed,
    CreationFailed,
    Cancelled,
    Unknown,
}

impl DomainError {
    /// Payload-free kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            DomainError::FileNotFound(_) => ErrorKind::FileNotFound,
            DomainError::FileTooSmall(_) => ErrorKind::FileTooSmall,
            DomainError::VideoTooShort(_) => ErrorKind::VideoTooShort,
            DomainError::NoVideoTrack(_) => ErrorKind::NoVideoTrack,
            DomainError::InvalidInput(_) => ErrorKind::InvalidInput,
            DomainError::ExportFailed(_) => ErrorKind::ExportFailed,
            DomainError::ImageProcessingFailed(_) => ErrorKind::ImageProcessingFailed,
            DomainError::SaveFailed(_) => ErrorKind::SaveFailed,
            DomainError::CreationFailed(_) => ErrorKind::CreationFailed,
            DomainError::Cancelled(_) => ErrorKind::Cancelled,
            DomainError::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Detail message carried by the error
    pub fn detail(&self) -> &str {
        match self {
            DomainError::PermissionDenied(msg)
            | DomainError::FileNotFound(msg)
            | DomainError::FileTooSmall(msg)
            | DomainError::VideoTooShort(msg)
            | DomainError::NoVideoTrack(msg)
            | DomainError::InvalidInput(msg)
            | DomainError::ExportFailed(msg)
            | DomainError::ImageProcessingFailed(msg)
            | DomainError::SaveFailed(msg)
            | DomainError::CreationFailed(msg)
            | DomainError::Cancelled(msg)
            | DomainError::Unknown(msg) => msg,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::FileTooSmall => "FileTooSmall",
            ErrorKind::VideoTooShort => "VideoTooShort",
            ErrorKind::NoVideoTrack => "NoVideoTrack",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::ExportFailed => "ExportFailed",
            ErrorKind::ImageProcessingFailed => "ImageProcessingFailed",
            ErrorKind::SaveFailed => "SaveFailed",
            ErrorKind::CreationFailed => "CreationFailed",
            ErrorKind::Cancelled => "Cancelled",
            ErrorKind::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}
