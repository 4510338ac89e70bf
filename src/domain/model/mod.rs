// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

#[cfg(test)]
mod tests;

/// Longest stretch of the source the segment search looks at
pub const SEGMENT_SCAN_LIMIT_SECONDS: f64 = 10.0;
/// Step between candidate window starts
pub const SEGMENT_SCAN_STEP_SECONDS: f64 = 0.5;
/// Frames sampled inside each candidate window
pub const FRAMES_PER_WINDOW: usize = 5;
/// Sources shorter than this are flagged as too short
pub const MIN_RECOMMENDED_DURATION_SECONDS: f64 = 1.0;
/// Files smaller than this cannot hold a usable video
pub const MIN_SOURCE_FILE_BYTES: u64 = 1024;

/// Input video handle. The pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SourceVideo {
    path: PathBuf,
}

impl SourceVideo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without directories, for logs and generated names
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.to_string_lossy().to_string())
    }
}

/// Frame or box size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_portrait(&self) -> bool {
        self.height > self.width
    }

    /// Swap the box axes so it has the same orientation as `frame`
    pub fn oriented_like(&self, frame: &Resolution) -> Resolution {
        if frame.is_portrait() != self.is_portrait() {
            Resolution::new(self.height, self.width)
        } else {
            *self
        }
    }

    /// Whether this frame already fits inside `target`
    pub fn fits_within(&self, target: &Resolution) -> bool {
        self.width <= target.width && self.height <= target.height
    }

    /// Largest even-sized frame with this aspect ratio that fits inside
    /// `target`. Never upscales.
    pub fn scaled_to_fit(&self, target: &Resolution) -> Resolution {
        if self.width == 0 || self.height == 0 || self.fits_within(target) {
            return *self;
        }
        let scale = f64::min(
            target.width as f64 / self.width as f64,
            target.height as f64 / self.height as f64,
        );
        let even = |v: f64| -> u32 { ((v.round() as u32) / 2 * 2).max(2) };
        Resolution::new(
            even(self.width as f64 * scale),
            even(self.height as f64 * scale),
        )
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Result of probing a source container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeResult {
    pub duration_seconds: f64,
    /// Coded frame size, before the display rotation is applied
    pub native_size: Resolution,
    pub frame_rate: f64,
    pub has_audio: bool,
    pub track_format_count: usize,
    pub video_codec: String,
    /// Display rotation in degrees, normalised to 0, 90, 180 or 270
    pub rotation: i32,
    pub file_size: u64,
}

impl ProbeResult {
    /// Frame size as the viewer displays it
    pub fn display_size(&self) -> Resolution {
        if self.rotation == 90 || self.rotation == 270 {
            Resolution::new(self.native_size.height, self.native_size.width)
        } else {
            self.native_size
        }
    }

    /// Duration of one frame in seconds
    pub fn frame_duration(&self) -> f64 {
        if self.frame_rate > 0.0 {
            1.0 / self.frame_rate
        } else {
            1.0 / 30.0
        }
    }
}

/// Encoder target attached to a quality profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExportPreset {
    Hd1920x1080,
    Hd1280x720,
    Qhd960x540,
    Passthrough,
}

impl ExportPreset {
    pub fn name(&self) -> &'static str {
        match self {
            ExportPreset::Hd1920x1080 => "1920x1080",
            ExportPreset::Hd1280x720 => "1280x720",
            ExportPreset::Qhd960x540 => "960x540",
            ExportPreset::Passthrough => "passthrough",
        }
    }

    /// x264 speed preset used when re-encoding
    pub fn encoder_speed(&self) -> Option<&'static str> {
        match self {
            ExportPreset::Hd1920x1080 => Some("slow"),
            ExportPreset::Hd1280x720 => Some("medium"),
            ExportPreset::Qhd960x540 => Some("veryfast"),
            ExportPreset::Passthrough => None,
        }
    }

    /// Constant rate factor used when re-encoding
    pub fn crf(&self) -> Option<u8> {
        match self {
            ExportPreset::Hd1920x1080 => Some(18),
            ExportPreset::Hd1280x720 => Some(22),
            ExportPreset::Qhd960x540 => Some(26),
            ExportPreset::Passthrough => None,
        }
    }

    /// Whether this preset can re-encode from the given source codec
    pub fn supports_codec(&self, codec: &str) -> bool {
        match self {
            ExportPreset::Passthrough => true,
            _ => matches!(
                codec,
                "h264" | "hevc" | "mpeg4" | "mpeg2video" | "vp8" | "vp9" | "av1" | "prores"
                    | "mjpeg" | "dnxhd" | "h263"
            ),
        }
    }
}

/// Named quality tiers offered to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityProfile {
    High,
    Balanced,
    Fast,
    Custom,
}

/// Resolved settings of a quality profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProfileSettings {
    pub export_preset: ExportPreset,
    pub max_duration_seconds: f64,
    pub target_resolution: Option<Resolution>,
}

impl QualityProfile {
    pub const ALL: [QualityProfile; 4] = [
        QualityProfile::High,
        QualityProfile::Balanced,
        QualityProfile::Fast,
        QualityProfile::Custom,
    ];

    pub fn settings(&self) -> ProfileSettings {
        match self {
            QualityProfile::High => ProfileSettings {
                export_preset: ExportPreset::Hd1920x1080,
                max_duration_seconds: 5.0,
                target_resolution: Some(Resolution::new(1920, 1080)),
            },
            QualityProfile::Balanced => ProfileSettings {
                export_preset: ExportPreset::Hd1280x720,
                max_duration_seconds: 3.0,
                target_resolution: Some(Resolution::new(1280, 720)),
            },
            QualityProfile::Fast => ProfileSettings {
                export_preset: ExportPreset::Qhd960x540,
                max_duration_seconds: 2.0,
                target_resolution: Some(Resolution::new(960, 540)),
            },
            QualityProfile::Custom => ProfileSettings {
                export_preset: ExportPreset::Passthrough,
                max_duration_seconds: 5.0,
                target_resolution: None,
            },
        }
    }

    pub fn max_duration_seconds(&self) -> f64 {
        self.settings().max_duration_seconds
    }

    /// Parse profile from its lowercase name
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        match name.trim().to_lowercase().as_str() {
            "high" => Ok(QualityProfile::High),
            "balanced" => Ok(QualityProfile::Balanced),
            "fast" => Ok(QualityProfile::Fast),
            "custom" => Ok(QualityProfile::Custom),
            other => Err(DomainError::InvalidInput(format!(
                "Unknown quality profile: {}. Valid profiles: high, balanced, fast, custom",
                other
            ))),
        }
    }
}

impl fmt::Display for QualityProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QualityProfile::High => "high",
            QualityProfile::Balanced => "balanced",
            QualityProfile::Fast => "fast",
            QualityProfile::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Sub-range of the source used for the clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    pub start_seconds: f64,
    pub duration_seconds: f64,
}

impl TimeRange {
    /// Create a range that must fit inside a source of `source_duration`
    pub fn new(
        start_seconds: f64,
        duration_seconds: f64,
        source_duration: f64,
    ) -> Result<Self, DomainError> {
        if start_seconds < 0.0 || duration_seconds <= 0.0 {
            return Err(DomainError::InvalidInput(format!(
                "Invalid time range: start {:.3}s, duration {:.3}s",
                start_seconds, duration_seconds
            )));
        }
        if start_seconds + duration_seconds > source_duration + 1e-6 {
            return Err(DomainError::InvalidInput(format!(
                "Time range {:.3}s+{:.3}s exceeds source duration {:.3}s",
                start_seconds, duration_seconds, source_duration
            )));
        }
        Ok(Self {
            start_seconds,
            duration_seconds,
        })
    }

    /// The whole source
    pub fn whole(source_duration: f64) -> Self {
        Self {
            start_seconds: 0.0,
            duration_seconds: source_duration.max(0.0),
        }
    }

    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.duration_seconds
    }

    pub fn midpoint(&self) -> f64 {
        self.start_seconds + self.duration_seconds / 2.0
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3}s..{:.3}s",
            self.start_seconds,
            self.end_seconds()
        )
    }
}

/// Shared key linking a still image to its clip
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContentIdentifier(String);

impl ContentIdentifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instant of the clip the still represents, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StillImageTime(f64);

impl StillImageTime {
    pub const ZERO: StillImageTime = StillImageTime(0.0);

    pub fn seconds(&self) -> f64 {
        self.0
    }

    /// String form written into the clip metadata
    pub fn to_metadata_string(&self) -> String {
        format!("{}", self.0)
    }
}

impl Default for StillImageTime {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Still image and clip waiting to be committed to the store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaPair {
    pub image_path: PathBuf,
    pub clip_path: PathBuf,
    pub content_id: ContentIdentifier,
    pub still_image_time: StillImageTime,
}

/// How the clip exporter produces the clip
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ExportMode {
    /// Stream copy of the selected range
    Passthrough,
    /// Re-encode at a preset with rotation applied, scaled to `output_size`
    /// (display orientation)
    Reencode {
        preset: ExportPreset,
        output_size: Resolution,
    },
}

/// Fully resolved clip export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPlan {
    pub source: PathBuf,
    pub output: PathBuf,
    pub range: TimeRange,
    pub mode: ExportMode,
    pub include_audio: bool,
    /// Container metadata entries written with the clip
    pub metadata: Vec<(String, String)>,
}

/// Per-video conversion state
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Idle,
    Probing,
    SelectingSegment,
    ExtractingFrame,
    Exporting,
    Persisting,
    Completed(String),
    Failed(DomainError),
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed(_) | JobState::Failed(_) | JobState::Cancelled
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Probing => "probing",
            JobState::SelectingSegment => "selecting-segment",
            JobState::ExtractingFrame => "extracting-frame",
            JobState::Exporting => "exporting",
            JobState::Persisting => "persisting",
            JobState::Completed(_) => "completed",
            JobState::Failed(_) => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

/// Kind of asset created in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssetKind {
    /// Still and clip linked by a content identifier
    LivePair,
    /// Still and clip stored side by side without linkage
    PlainPair,
}

/// Persistence tier that produced an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersistTier {
    Primary,
    Backup,
    UltraSimple,
}

impl fmt::Display for PersistTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistTier::Primary => write!(f, "primary"),
            PersistTier::Backup => write!(f, "backup"),
            PersistTier::UltraSimple => write!(f, "ultra-simple"),
        }
    }
}

/// Asset as recorded by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    pub kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

/// Whether a stored asset still behaves as a live photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Linked,
    Degraded,
}

/// Successful persistence result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistOutcome {
    pub asset: AssetRecord,
    pub tier: PersistTier,
    pub linkage: Linkage,
}

/// Resource type hint passed to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeHint {
    Jpeg,
    QuickTimeMovie,
}

impl TypeHint {
    pub fn mime_type(&self) -> &'static str {
        match self {
            TypeHint::Jpeg => "image/jpeg",
            TypeHint::QuickTimeMovie => "video/quicktime",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TypeHint::Jpeg => "JPG",
            TypeHint::QuickTimeMovie => "MOV",
        }
    }
}

/// Small grayscale frame used for motion scoring
#[derive(Debug, Clone, PartialEq)]
pub struct LumaFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl LumaFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, DomainError> {
        let expected = width as usize * height as usize;
        if expected == 0 || data.len() != expected {
            return Err(DomainError::ImageProcessingFailed(format!(
                "Frame buffer of {} bytes does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }
}
