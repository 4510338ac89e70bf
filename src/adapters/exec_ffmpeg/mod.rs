//! FFmpeg execution adapter
//!
//! Implements [`MediaPort`] on top of the ffmpeg and ffprobe command-line
//! tools.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::adapters::probe_ffprobe::FfprobeAdapter;
use crate::domain::model::*;
use crate::engine::command::{FfmpegCommand, Tool, ToolRunner};
use crate::engine::copy::StreamCopyClipper;
use crate::engine::reencode::ReencodeClipper;
use crate::engine::still::FrameCommands;
use crate::error::{MediaError, MediaResult};
use crate::ports::*;

/// FFmpeg-based media adapter
#[derive(Debug, Clone)]
pub struct FfmpegMediaAdapter {
    ffmpeg: ToolRunner,
    ffprobe: FfprobeAdapter,
}

impl FfmpegMediaAdapter {
    pub fn new(ffmpeg_path: Option<PathBuf>, ffprobe_path: Option<PathBuf>) -> Self {
        Self {
            ffmpeg: ToolRunner::new(Tool::Ffmpeg, ffmpeg_path),
            ffprobe: FfprobeAdapter::new(ffprobe_path),
        }
    }

    async fn run_to_file(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.ffmpeg.run(cmd).await?;
        match tokio::fs::metadata(cmd.output()).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err(MediaError::ffmpeg_failed(
                format!("ffmpeg produced no output at {}", cmd.output().display()),
                None,
                None,
            )),
        }
    }
}

#[async_trait]
impl MediaPort for FfmpegMediaAdapter {
    async fn probe(&self, path: &Path) -> MediaResult<ContainerProbe> {
        self.ffprobe.probe(path).await
    }

    async fn keyframe_times(&self, path: &Path, from: f64, to: f64) -> MediaResult<Vec<f64>> {
        self.ffprobe.keyframe_times(path, from, to).await
    }

    async fn sample_luma(&self, path: &Path, at: f64, size: Resolution) -> MediaResult<LumaFrame> {
        let cmd = FrameCommands::luma(path, at, size);
        let mut bytes = self.ffmpeg.run_capture(&cmd).await?;
        let expected = size.width as usize * size.height as usize;
        if bytes.len() < expected {
            return Err(MediaError::ffmpeg_failed(
                format!(
                    "Decoded {} bytes at {:.3}s, expected {}",
                    bytes.len(),
                    at,
                    expected
                ),
                None,
                None,
            ));
        }
        bytes.truncate(expected);
        LumaFrame::new(size.width, size.height, bytes)
            .map_err(|e| MediaError::Unsupported(e.to_string()))
    }

    async fn render_still(&self, path: &Path, at: f64, output: &Path) -> MediaResult<()> {
        self.run_to_file(&FrameCommands::render(path, at, output)).await
    }

    async fn export_clip(&self, plan: &ExportPlan) -> MediaResult<()> {
        let cmd = match ReencodeClipper::for_plan(plan) {
            Some(cmd) => cmd,
            None => StreamCopyClipper::command(plan),
        };
        self.run_to_file(&cmd).await
    }

    async fn retag_clip(
        &self,
        input: &Path,
        output: &Path,
        tags: &[(String, String)],
    ) -> MediaResult<()> {
        let cmd = FfmpegCommand::new(input, output)
            .output_args(["-map", "0", "-c", "copy", "-map_metadata", "-1"])
            .metadata_tags();
        let cmd = tags
            .iter()
            .fold(cmd, |cmd, (key, value)| cmd.metadata(key, value));
        self.run_to_file(&cmd).await
    }

    async fn extract_first_frame(&self, clip: &Path, output: &Path) -> MediaResult<()> {
        self.run_to_file(&FrameCommands::first_frame(clip, output)).await
    }
}
