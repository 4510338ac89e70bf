//! Low-level error type for media, metadata and store operations
//!
//! Adapters and codecs report a [`MediaError`]. The error classifier lifts it
//! into the closed [`DomainError`](crate::domain::errors::DomainError)
//! taxonomy once the phase it happened in is known.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for LivePair media operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// FFmpeg executable could not be located
    #[error("FFmpeg not found: {0}")]
    FfmpegNotFound(String),

    /// FFprobe executable could not be located
    #[error("FFprobe not found: {0}")]
    FfprobeNotFound(String),

    /// FFmpeg exited with a failure status
    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    /// FFprobe exited with a failure status
    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    /// Input file not found or inaccessible
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Container or codec cannot be handled
    #[error("Unsupported media: {0}")]
    Unsupported(String),

    /// Binary metadata could not be parsed or written
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// Asset store rejected the request
    #[error("Asset store error: {message}")]
    Store { message: String },

    /// Asset store access is not authorized
    #[error("Asset store access denied: {0}")]
    AccessDenied(String),

    /// Operation cancelled
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Exif structure could not be read or written
    #[error("Exif error: {0}")]
    Exif(#[from] exif::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a metadata codec error.
    pub fn metadata(message: impl Into<String>) -> Self {
        Self::Metadata(message.into())
    }

    /// Create a store rejection error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Whether the underlying cause is a permission problem.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::AccessDenied(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Whether the underlying cause is a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::FileNotFound(_) => true,
            Self::Io(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias for media operations
pub type MediaResult<T> = std::result::Result<T, MediaError>;
