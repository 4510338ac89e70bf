//! Re-encoding clip implementation

use crate::domain::model::{ExportMode, ExportPlan, ExportPreset, Resolution};
use crate::engine::command::FfmpegCommand;

const VIDEO_ENCODER: &str = "libx264";
const AUDIO_ENCODER: &str = "aac";
const AUDIO_BITRATE: &str = "128k";

/// Re-encoding clipper used when a profile target or the source codec
/// rules out stream copy
pub struct ReencodeClipper;

impl ReencodeClipper {
    /// Build the re-encode command for `plan`. ffmpeg applies the display
    /// rotation while decoding, so the clip needs no rotation matrix.
    pub fn command(plan: &ExportPlan, preset: ExportPreset, size: Resolution) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new(&plan.source, &plan.output)
            .seek(plan.range.start_seconds)
            .duration(plan.range.duration_seconds)
            .output_args(["-map", "0:v:0"])
            .video_filter(format!("scale={}:{},format=yuv420p", size.width, size.height))
            .video_codec(VIDEO_ENCODER);

        if let Some(speed) = preset.encoder_speed() {
            cmd = cmd.preset(speed);
        }
        if let Some(crf) = preset.crf() {
            cmd = cmd.crf(crf);
        }

        cmd = if plan.include_audio {
            cmd.output_args(["-map", "0:a:0?"])
                .audio_codec(AUDIO_ENCODER)
                .output_args(["-b:a", AUDIO_BITRATE])
        } else {
            cmd.no_audio()
        };

        let cmd = cmd.metadata_tags();
        plan.metadata
            .iter()
            .fold(cmd, |cmd, (key, value)| cmd.metadata(key, value))
    }

    /// Command for any plan in re-encode mode
    pub fn for_plan(plan: &ExportPlan) -> Option<FfmpegCommand> {
        match plan.mode {
            ExportMode::Reencode {
                preset,
                output_size,
            } => Some(Self::command(plan, preset, output_size)),
            ExportMode::Passthrough => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::*;
    use std::path::PathBuf;

    fn plan(include_audio: bool) -> ExportPlan {
        ExportPlan {
            source: PathBuf::from("in.mp4"),
            output: PathBuf::from("out.mov"),
            range: TimeRange::new(0.0, 3.0, 10.0).unwrap(),
            mode: ExportMode::Reencode {
                preset: ExportPreset::Hd1280x720,
                output_size: Resolution::new(1280, 720),
            },
            include_audio,
            metadata: vec![(
                "com.apple.quicktime.content.identifier".into(),
                "ABC".into(),
            )],
        }
    }

    #[test]
    fn test_reencode_command_scales_to_target() {
        let args = ReencodeClipper::for_plan(&plan(true)).unwrap().build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-vf scale=1280:720,format=yuv420p"));
        assert!(joined.contains("-c:v libx264"));
        assert!(joined.contains("-preset medium"));
        assert!(joined.contains("-crf 22"));
        assert!(joined.contains("-c:a aac"));
        assert!(joined.contains("-metadata com.apple.quicktime.content.identifier=ABC"));
        assert!(!joined.contains("-noautorotate"));
    }

    #[test]
    fn test_reencode_command_drops_audio() {
        let args = ReencodeClipper::for_plan(&plan(false)).unwrap().build_args();
        assert!(args.contains(&"-an".to_string()));
        assert!(!args.contains(&"aac".to_string()));
    }

    #[test]
    fn test_passthrough_plan_has_no_reencode_command() {
        let mut p = plan(true);
        p.mode = ExportMode::Passthrough;
        assert!(ReencodeClipper::for_plan(&p).is_none());
    }
}
