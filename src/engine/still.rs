//! Key-frame extraction and frame decoding commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::imageops::FilterType;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::FrameQuality;
use crate::domain::usecases::JobFailure;
use crate::engine::command::{FfmpegCommand, PIPE_OUTPUT};
use crate::error::{MediaError, MediaResult};
use crate::ports::{LogPort, MediaPort};

/// Width of the grayscale grids used for scoring
pub const LUMA_GRID_WIDTH: u32 = 64;
/// JPEG quality scale of ffmpeg's mjpeg encoder, 2 is near best
const JPEG_QSCALE: &str = "2";

/// FFmpeg commands that decode single frames
pub struct FrameCommands;

impl FrameCommands {
    /// Render the frame at `at` as a JPEG, display orientation applied
    pub fn render(source: &Path, at: f64, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(source, output)
            .seek(at)
            .single_frame()
            .output_args(["-q:v", JPEG_QSCALE])
    }

    /// Decode the frame at `at` to raw 8-bit gray on stdout
    pub fn luma(source: &Path, at: f64, size: Resolution) -> FfmpegCommand {
        FfmpegCommand::new(source, PIPE_OUTPUT)
            .seek(at)
            .video_filter(format!("scale={}:{}", size.width, size.height))
            .single_frame()
            .output_args(["-pix_fmt", "gray", "-f", "rawvideo"])
    }

    /// Render the first frame of a clip as a JPEG
    pub fn first_frame(clip: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(clip, output)
            .single_frame()
            .output_args(["-q:v", JPEG_QSCALE])
    }
}

/// Grid size with the aspect ratio of `display`, `LUMA_GRID_WIDTH` wide
pub fn luma_grid_for(display: Resolution) -> Resolution {
    if display.width == 0 || display.height == 0 {
        return Resolution::new(LUMA_GRID_WIDTH, LUMA_GRID_WIDTH);
    }
    let height = (LUMA_GRID_WIDTH as f64 * display.height as f64 / display.width as f64).round();
    let height = ((height as u32) / 2 * 2).max(2);
    Resolution::new(LUMA_GRID_WIDTH, height)
}

/// Decode a rendered still into a scoring grid
pub fn luma_from_image(path: &Path) -> MediaResult<LumaFrame> {
    let gray = image::open(path)?.to_luma8();
    let grid = luma_grid_for(Resolution::new(gray.width(), gray.height()));
    let small = image::imageops::resize(&gray, grid.width, grid.height, FilterType::Triangle);
    LumaFrame::new(small.width(), small.height(), small.into_raw())
        .map_err(|e| MediaError::Unsupported(e.to_string()))
}

/// Renders the still image for a job
pub struct KeyFrameExtractor {
    media: Arc<dyn MediaPort>,
    log: Arc<dyn LogPort>,
    candidates: usize,
}

impl KeyFrameExtractor {
    pub fn new(media: Arc<dyn MediaPort>, log: Arc<dyn LogPort>, candidates: usize) -> Self {
        Self {
            media,
            log,
            candidates: candidates.max(1),
        }
    }

    /// Render the still for `range` into `scratch`. With one candidate the
    /// frame at the range start is used as is; otherwise the best scoring
    /// candidate wins and the earliest wins a tie.
    pub async fn extract(
        &self,
        source: &SourceVideo,
        range: &TimeRange,
        scratch: &Path,
    ) -> Result<PathBuf, JobFailure> {
        let target = scratch.join("still.jpg");
        let offsets = FrameQuality::candidate_offsets(range, self.candidates);

        if offsets.len() == 1 {
            self.media
                .render_still(source.path(), offsets[0], &target)
                .await
                .map_err(|e| JobFailure::lifted(Phase::ExtractingFrame, &e))?;
            ensure_rendered(&target).await?;
            return Ok(target);
        }

        let mut best: Option<(PathBuf, f64)> = None;
        let mut last_error = None;
        for (index, at) in offsets.iter().copied().enumerate() {
            let candidate = scratch.join(format!("candidate-{}.jpg", index));
            match self.score_candidate(source, at, range, &candidate).await {
                Ok(score) => {
                    self.log
                        .debug(&format!("Still candidate at {:.3}s scored {:.3}", at, score))
                        .await;
                    if best.as_ref().map_or(true, |(_, s)| score > *s) {
                        best = Some((candidate, score));
                    }
                }
                Err(e) => {
                    self.log
                        .warn(&format!("Skipping still candidate at {:.3}s: {}", at, e))
                        .await;
                    last_error = Some(e);
                }
            }
        }

        let Some((winner, _)) = best else {
            return Err(JobFailure::new(
                DomainError::ImageProcessingFailed(format!(
                    "No still candidate could be rendered for {}",
                    source.display_name()
                )),
                last_error.map(|e| format!("{:?}", e)),
            ));
        };
        tokio::fs::rename(&winner, &target)
            .await
            .map_err(|e| DomainError::ImageProcessingFailed(e.to_string()))?;
        Ok(target)
    }

    async fn score_candidate(
        &self,
        source: &SourceVideo,
        at: f64,
        range: &TimeRange,
        output: &Path,
    ) -> MediaResult<f64> {
        self.media.render_still(source.path(), at, output).await?;
        let path = output.to_path_buf();
        let frame = tokio::task::spawn_blocking(move || luma_from_image(&path))
            .await
            .map_err(|e| MediaError::Unsupported(format!("Still scoring task failed: {}", e)))??;

        Ok(FrameQuality::composite(
            FrameQuality::centering(at, range),
            FrameQuality::sharpness(&frame),
            FrameQuality::brightness(&frame),
        ))
    }
}

async fn ensure_rendered(path: &Path) -> Result<(), DomainError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(DomainError::ImageProcessingFailed(format!(
            "Still image was not produced at {}",
            path.display()
        ))),
    }
}
