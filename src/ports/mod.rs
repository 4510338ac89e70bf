// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::model::*;
use crate::error::MediaResult;

/// First video track of a container
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTrackInfo {
    pub size: Resolution,
    pub frame_rate: f64,
    pub codec: String,
    /// Clockwise display rotation, normalised to 0, 90, 180 or 270
    pub rotation: i32,
}

/// Raw container description reported by the media backend
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerProbe {
    pub duration_seconds: f64,
    pub file_size: u64,
    pub track_format_count: usize,
    pub has_audio: bool,
    pub video: Option<VideoTrackInfo>,
}

/// Port for media probing, decoding and encoding
#[async_trait]
pub trait MediaPort: Send + Sync {
    /// Describe the tracks of a container
    async fn probe(&self, path: &Path) -> MediaResult<ContainerProbe>;

    /// Keyframe timestamps of the first video stream inside `[from, to]`
    async fn keyframe_times(&self, path: &Path, from: f64, to: f64) -> MediaResult<Vec<f64>>;

    /// Decode one frame at `at` as a grayscale grid of `size` (display orientation)
    async fn sample_luma(&self, path: &Path, at: f64, size: Resolution) -> MediaResult<LumaFrame>;

    /// Render one frame at `at` to a JPEG file with the display orientation applied
    async fn render_still(&self, path: &Path, at: f64, output: &Path) -> MediaResult<()>;

    /// Write the clip described by `plan`
    async fn export_clip(&self, plan: &ExportPlan) -> MediaResult<()>;

    /// Copy a clip, dropping its container metadata and writing `tags` instead
    async fn retag_clip(
        &self,
        input: &Path,
        output: &Path,
        tags: &[(String, String)],
    ) -> MediaResult<()>;

    /// Render the first frame of a clip to a JPEG file
    async fn extract_first_frame(&self, clip: &Path, output: &Path) -> MediaResult<()>;
}

/// Store authorization status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Authorized,
    Denied(String),
}

/// One paired write request
#[derive(Debug, Clone, PartialEq)]
pub struct PairedAssetRequest {
    pub image_path: PathBuf,
    pub clip_path: PathBuf,
    pub image_hint: Option<TypeHint>,
    pub clip_hint: Option<TypeHint>,
    pub kind: AssetKind,
}

/// Port for the asset store receiving finished pairs
#[async_trait]
pub trait AssetStorePort: Send + Sync {
    /// Current authorization status
    async fn authorization(&self) -> Authorization;

    /// Create one asset from both resources, all or nothing
    async fn create_paired_asset(&self, request: &PairedAssetRequest) -> MediaResult<AssetRecord>;
}

/// Port for logging and observability
#[async_trait]
pub trait LogPort: Send + Sync {
    /// Log info message
    async fn info(&self, message: &str);

    /// Log warning message
    async fn warn(&self, message: &str);

    /// Log error message
    async fn error(&self, message: &str);

    /// Log debug message
    async fn debug(&self, message: &str);
}

/// Progress update for a batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    /// Overall batch fraction in `[0, 1]`
    pub fraction: f64,
    pub job_index: usize,
}

/// Port receiving coarse progress milestones
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Progress sink that forwards into an unbounded channel
pub struct ChannelProgress {
    sender: mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelProgress {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ProgressSink for ChannelProgress {
    fn report(&self, update: ProgressUpdate) {
        // Receiver gone means nobody is listening any more
        let _ = self.sender.send(update);
    }
}

/// Progress sink that drops every update
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _update: ProgressUpdate) {}
}
