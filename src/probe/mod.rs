//! Video probing and compatibility checks

use std::sync::Arc;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::CompatibilityRules;
use crate::domain::usecases::JobFailure;
use crate::ports::{LogPort, MediaPort};

pub mod validator;

/// Probe result plus the non-fatal findings made along the way
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub probe: ProbeResult,
    pub warnings: Vec<DomainError>,
}

/// Reads the properties of a source video
pub struct VideoProber {
    media: Arc<dyn MediaPort>,
    log: Arc<dyn LogPort>,
}

impl VideoProber {
    pub fn new(media: Arc<dyn MediaPort>, log: Arc<dyn LogPort>) -> Self {
        Self { media, log }
    }

    /// Probe `source`. Short videos are accepted with a `VideoTooShort`
    /// warning.
    pub async fn probe(&self, source: &SourceVideo) -> Result<ProbeOutcome, JobFailure> {
        let path = source.path();
        let meta = tokio::fs::metadata(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DomainError::FileNotFound(path.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                DomainError::PermissionDenied(format!("Cannot read {}", path.display()))
            }
            _ => DomainError::InvalidInput(format!("Cannot open {}: {}", path.display(), e)),
        })?;
        if !meta.is_file() {
            return Err(DomainError::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            ))
            .into());
        }
        if let Some(error) = CompatibilityRules::check_file_size(meta.len()) {
            return Err(error.into());
        }

        let container = self
            .media
            .probe(path)
            .await
            .map_err(|e| JobFailure::lifted(Phase::Probing, &e))?;

        let Some(video) = container.video else {
            return Err(DomainError::NoVideoTrack(source.display_name()).into());
        };
        if container.duration_seconds.is_nan() || container.duration_seconds <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "{} reports no playable duration",
                source.display_name()
            ))
            .into());
        }

        let probe = ProbeResult {
            duration_seconds: container.duration_seconds,
            native_size: video.size,
            frame_rate: video.frame_rate,
            has_audio: container.has_audio,
            track_format_count: container.track_format_count,
            video_codec: video.codec,
            rotation: video.rotation,
            file_size: container.file_size.max(meta.len()),
        };

        let mut warnings = Vec::new();
        if let Some(warning) = CompatibilityRules::check_duration(probe.duration_seconds) {
            self.log
                .warn(&format!("{}: {}", source.display_name(), warning))
                .await;
            warnings.push(warning);
        }

        self.log
            .debug(&format!(
                "Probed {}: {:.3}s {} @ {:.2} fps, codec {}, rotation {}, audio {}",
                source.display_name(),
                probe.duration_seconds,
                probe.native_size,
                probe.frame_rate,
                probe.video_codec,
                probe.rotation,
                probe.has_audio
            ))
            .await;

        Ok(ProbeOutcome { probe, warnings })
    }
}
