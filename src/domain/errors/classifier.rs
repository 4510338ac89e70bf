//! Error classification
//!
//! Two pure steps: [`ErrorClassifier::lift`] maps a low-level [`MediaError`]
//! onto the [`DomainError`] taxonomy given the job phase it surfaced in, and
//! [`ErrorClassifier::report`] annotates a domain error with a title,
//! remediation suggestions, severity and a retryability flag.

use std::fmt;

use serde::Serialize;

use super::{DomainError, ErrorKind};
use crate::error::MediaError;

/// Job phase a failure surfaced in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Validation,
    Probing,
    SelectingSegment,
    ExtractingFrame,
    Exporting,
    Persisting,
}

/// Severity attached to a classified error
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// User-facing description of a failure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub title: String,
    pub message: String,
    pub suggestions: Vec<String>,
    pub severity: Severity,
    pub retryable: bool,
}

/// Pure mapping from failures to the error taxonomy
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Lift a low-level failure into the domain taxonomy.
    pub fn lift(phase: Phase, error: &MediaError) -> DomainError {
        let detail = error.to_string();

        if matches!(error, MediaError::Cancelled) {
            return DomainError::Cancelled(detail);
        }
        if error.is_permission_denied() {
            return DomainError::PermissionDenied(detail);
        }
        if matches!(
            error,
            MediaError::FfmpegNotFound(_) | MediaError::FfprobeNotFound(_)
        ) {
            return DomainError::Unknown(detail);
        }

        match phase {
            Phase::Validation | Phase::Probing => {
                if error.is_not_found() {
                    DomainError::FileNotFound(detail)
                } else {
                    DomainError::InvalidInput(detail)
                }
            }
            Phase::SelectingSegment => DomainError::InvalidInput(detail),
            Phase::ExtractingFrame => DomainError::ImageProcessingFailed(detail),
            Phase::Exporting => DomainError::ExportFailed(detail),
            Phase::Persisting => match error {
                MediaError::Store { .. } => DomainError::SaveFailed(detail),
                _ => DomainError::CreationFailed(detail),
            },
        }
    }

    /// Describe a domain error for the caller.
    pub fn report(error: &DomainError) -> ErrorReport {
        let (title, suggestions, severity, retryable): (&str, &[&str], Severity, bool) =
            match error {
                DomainError::PermissionDenied(_) => (
                    "Photo library access denied",
                    &[
                        "Grant write access to the photo library",
                        "Check the library directory permissions",
                        "Retry the conversion once access is granted",
                    ],
                    Severity::Critical,
                    true,
                ),
                DomainError::FileNotFound(_) => (
                    "Video not found",
                    &[
                        "Check that the video file still exists",
                        "Select the video again",
                    ],
                    Severity::Error,
                    false,
                ),
                DomainError::FileTooSmall(_) => (
                    "Video file is too small",
                    &[
                        "The file may be truncated or still downloading",
                        "Choose a different video",
                    ],
                    Severity::Error,
                    false,
                ),
                DomainError::VideoTooShort(_) => (
                    "Video is very short",
                    &[
                        "Live photos work best with at least one second of video",
                        "The clip will use the whole video",
                    ],
                    Severity::Warning,
                    false,
                ),
                DomainError::NoVideoTrack(_) => (
                    "No video track",
                    &[
                        "The file contains no playable video",
                        "Choose a different file",
                    ],
                    Severity::Error,
                    false,
                ),
                DomainError::InvalidInput(_) => (
                    "Unsupported video",
                    &[
                        "The file could not be read as a video",
                        "Convert the video to MP4 or MOV and try again",
                    ],
                    Severity::Error,
                    false,
                ),
                DomainError::ExportFailed(_) => (
                    "Clip export failed",
                    &[
                        "Try a different quality setting",
                        "Free up disk space",
                        "Try again",
                    ],
                    Severity::Error,
                    true,
                ),
                DomainError::ImageProcessingFailed(_) => (
                    "Still image could not be created",
                    &["Try a different video", "Try again"],
                    Severity::Error,
                    true,
                ),
                DomainError::SaveFailed(_) => (
                    "Saving to the photo library failed",
                    &[
                        "Free up space in the photo library",
                        "Check library permissions",
                        "Try again",
                    ],
                    Severity::Critical,
                    true,
                ),
                DomainError::CreationFailed(_) => (
                    "Live photo could not be created",
                    &["Free up disk space", "Try a different quality setting", "Try again"],
                    Severity::Error,
                    true,
                ),
                DomainError::Cancelled(_) => (
                    "Conversion cancelled",
                    &["Start the conversion again when ready"],
                    Severity::Info,
                    true,
                ),
                DomainError::Unknown(_) => (
                    "Unexpected error",
                    &[
                        "Make sure ffmpeg and ffprobe are installed",
                        "Try again",
                        "Report the problem if it persists",
                    ],
                    Severity::Error,
                    true,
                ),
            };

        ErrorReport {
            kind: error.kind(),
            title: title.to_string(),
            message: error.detail().to_string(),
            suggestions: suggestions.iter().map(|s| s.to_string()).collect(),
            severity,
            retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_lift_not_found_during_probe() {
        let err = MediaError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(
            ErrorClassifier::lift(Phase::Probing, &err).kind(),
            ErrorKind::FileNotFound
        );
    }

    #[test]
    fn test_lift_permission_wins_over_phase() {
        let err = MediaError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "ro"));
        assert_eq!(
            ErrorClassifier::lift(Phase::Exporting, &err).kind(),
            ErrorKind::PermissionDenied
        );
    }

    #[test]
    fn test_lift_by_phase() {
        let err = MediaError::ffmpeg_failed("boom", None, Some(1));
        assert_eq!(
            ErrorClassifier::lift(Phase::Exporting, &err).kind(),
            ErrorKind::ExportFailed
        );
        assert_eq!(
            ErrorClassifier::lift(Phase::ExtractingFrame, &err).kind(),
            ErrorKind::ImageProcessingFailed
        );
        assert_eq!(
            ErrorClassifier::lift(Phase::Persisting, &err).kind(),
            ErrorKind::CreationFailed
        );
        assert_eq!(
            ErrorClassifier::lift(Phase::Persisting, &MediaError::store("full")).kind(),
            ErrorKind::SaveFailed
        );
    }

    #[test]
    fn test_report_severity_and_retry() {
        let warning = ErrorClassifier::report(&DomainError::VideoTooShort("0.4s".into()));
        assert_eq!(warning.severity, Severity::Warning);
        assert!(!warning.retryable);

        let denied = ErrorClassifier::report(&DomainError::PermissionDenied("no".into()));
        assert_eq!(denied.severity, Severity::Critical);
        assert!(denied.retryable);
        assert!(!denied.suggestions.is_empty());
        assert_eq!(denied.message, "no");
    }
}
