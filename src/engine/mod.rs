//! Clip export engine
//!
//! Decides between stream copy and re-encode for a selected range and drives
//! the media backend to write the tagged clip.

use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::usecases::JobFailure;
use crate::planner::gop::GOPAnalyzer;
use crate::ports::{LogPort, MediaPort};

pub mod command;
pub mod copy;
pub mod progress;
pub mod reencode;
pub mod still;

/// Codecs that can be stream copied into a QuickTime clip
const COPYABLE_CODECS: &[&str] = &["h264", "hevc"];

/// Whether the profile forces a re-encode of this source
pub fn requires_reencode(probe: &ProbeResult, settings: &ProfileSettings) -> bool {
    match settings.target_resolution {
        None => false,
        Some(target) => {
            let display = probe.display_size();
            !display.fits_within(&target.oriented_like(&display))
                || !COPYABLE_CODECS.contains(&probe.video_codec.as_str())
        }
    }
}

/// Re-encode mode for a profile with a target box
fn reencode_mode(
    probe: &ProbeResult,
    profile: QualityProfile,
    settings: &ProfileSettings,
) -> Result<ExportMode, DomainError> {
    let preset = settings.export_preset;
    if !preset.supports_codec(&probe.video_codec) {
        return Err(DomainError::ExportFailed(format!(
            "Preset {} cannot re-encode {} video",
            preset.name(),
            probe.video_codec
        )));
    }
    let display = probe.display_size();
    let output_size = match settings.target_resolution {
        Some(target) => display.scaled_to_fit(&target.oriented_like(&display)),
        None => {
            return Err(DomainError::ExportFailed(format!(
                "Profile {} has no re-encode target",
                profile
            )))
        }
    };
    Ok(ExportMode::Reencode {
        preset,
        output_size,
    })
}

/// Resolve the export mode. `keyframe_aligned` tells whether a stream copy
/// would start on a keyframe.
pub fn resolve_mode(
    probe: &ProbeResult,
    profile: QualityProfile,
    keyframe_aligned: bool,
) -> Result<ExportMode, DomainError> {
    let settings = profile.settings();
    if requires_reencode(probe, &settings) {
        return reencode_mode(probe, profile, &settings);
    }
    if keyframe_aligned {
        return Ok(ExportMode::Passthrough);
    }
    if settings.target_resolution.is_none() {
        return Err(DomainError::ExportFailed(
            "Stream copy cannot start here: the range does not begin on a keyframe".to_string(),
        ));
    }
    reencode_mode(probe, profile, &settings)
}

/// Writes the clip for a job
pub struct ClipExporter {
    media: Arc<dyn MediaPort>,
    log: Arc<dyn LogPort>,
}

impl ClipExporter {
    pub fn new(media: Arc<dyn MediaPort>, log: Arc<dyn LogPort>) -> Self {
        Self { media, log }
    }

    /// Plan the export of `range` to `output`
    pub async fn plan(
        &self,
        source: &SourceVideo,
        probe: &ProbeResult,
        range: &TimeRange,
        profile: QualityProfile,
        include_audio: bool,
        metadata: Vec<(String, String)>,
        output: &Path,
    ) -> Result<ExportPlan, DomainError> {
        let settings = profile.settings();
        let aligned = if requires_reencode(probe, &settings) {
            false
        } else {
            self.keyframe_aligned(source, probe, range.start_seconds).await
        };
        let mode = resolve_mode(probe, profile, aligned)?;

        Ok(ExportPlan {
            source: source.path().to_path_buf(),
            output: output.to_path_buf(),
            range: *range,
            mode,
            include_audio: include_audio && probe.has_audio,
            metadata,
        })
    }

    /// Write the planned clip and check it landed on disk
    pub async fn export(&self, plan: &ExportPlan) -> Result<(), JobFailure> {
        match plan.mode {
            ExportMode::Passthrough => {
                self.log
                    .info(&format!("Exporting {} by stream copy", plan.range))
                    .await
            }
            ExportMode::Reencode {
                preset,
                output_size,
            } => {
                self.log
                    .info(&format!(
                        "Exporting {} re-encoded at {} ({})",
                        plan.range,
                        output_size,
                        preset.name()
                    ))
                    .await
            }
        }

        self.media
            .export_clip(plan)
            .await
            .map_err(|e| JobFailure::lifted(Phase::Exporting, &e))?;

        match tokio::fs::metadata(&plan.output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(DomainError::ExportFailed(format!(
                "Clip was not written to {}",
                plan.output.display()
            ))
            .into()),
        }
    }

    async fn keyframe_aligned(&self, source: &SourceVideo, probe: &ProbeResult, start: f64) -> bool {
        let tolerance = probe.frame_duration() / 2.0;
        if start <= tolerance {
            return true;
        }
        match self
            .media
            .keyframe_times(source.path(), start - 1.0, start + 1.0)
            .await
        {
            Ok(keyframes) => {
                let aligned = GOPAnalyzer::is_aligned(&keyframes, start, tolerance);
                if !aligned {
                    let info = GOPAnalyzer::around(&keyframes, start);
                    self.log
                        .debug(&format!(
                            "No keyframe at {:.3}s (previous {:?}, next {:?})",
                            start, info.start_keyframe, info.next_keyframe
                        ))
                        .await;
                }
                aligned
            }
            Err(e) => {
                self.log
                    .warn(&format!("Keyframe lookup failed, assuming unaligned: {}", e))
                    .await;
                false
            }
        }
    }
}
