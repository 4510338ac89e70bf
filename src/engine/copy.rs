//! Stream copy implementation

use crate::domain::model::ExportPlan;
use crate::engine::command::FfmpegCommand;

/// Stream copy clipper for lossless passthrough clips
pub struct StreamCopyClipper;

impl StreamCopyClipper {
    /// Build the stream copy command for `plan`. The display matrix of the
    /// source travels with the copied bitstream.
    pub fn command(plan: &ExportPlan) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(&plan.source, &plan.output)
            .seek(plan.range.start_seconds)
            .duration(plan.range.duration_seconds)
            .output_args(["-map", "0:v:0"]);

        let cmd = if plan.include_audio {
            cmd.output_args(["-map", "0:a:0?"])
        } else {
            cmd.no_audio()
        };

        let cmd = cmd
            .output_args(["-c", "copy", "-avoid_negative_ts", "make_zero"])
            .metadata_tags();

        plan.metadata
            .iter()
            .fold(cmd, |cmd, (key, value)| cmd.metadata(key, value))
    }
}
