//! Fake ports shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use livepair_cli::app::CancelHandle;
use livepair_cli::domain::model::*;
use livepair_cli::domain::usecases::PairVerification;
use livepair_cli::error::{MediaError, MediaResult};
use livepair_cli::pairing::{quicktime, PairingEngine};
use livepair_cli::ports::*;

/// Luma value of the uniform frame shown at a timestamp
pub type Scene = Arc<dyn Fn(f64) -> u8 + Send + Sync>;

/// Write a source file large enough to pass the size check
pub fn write_source(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, vec![0u8; 4096]).unwrap();
    path
}

/// Small real JPEG with a uniform gray level
pub fn tiny_jpeg(level: u8) -> Vec<u8> {
    sized_jpeg(level, 16)
}

/// Square JPEG of `side` pixels with a uniform gray level
pub fn sized_jpeg(level: u8, side: u32) -> Vec<u8> {
    let img = image::GrayImage::from_pixel(side, side, image::Luma([level]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Jpeg(90),
        )
        .unwrap();
    bytes
}

/// Probe of a 10 s, 30 fps, 1920x1080 h264 source with audio
pub fn hd_probe(duration_seconds: f64) -> ContainerProbe {
    ContainerProbe {
        duration_seconds,
        file_size: 8_000_000,
        track_format_count: 2,
        has_audio: true,
        video: Some(VideoTrackInfo {
            size: Resolution::new(1920, 1080),
            frame_rate: 30.0,
            codec: "h264".to_string(),
            rotation: 0,
        }),
    }
}

/// Media backend producing synthetic frames and files
pub struct FakeMedia {
    pub container: Mutex<ContainerProbe>,
    pub keyframes: Mutex<Vec<f64>>,
    pub scene: Scene,
    /// Side length of the still rendered at a timestamp
    pub still_side: Arc<dyn Fn(f64) -> u32 + Send + Sync>,
    pub fail_export: bool,
    pub fail_renders: bool,
    pub fail_first_frame: bool,
    pub cancel_on_render: Mutex<Option<CancelHandle>>,
    pub probes: AtomicUsize,
    pub luma_samples: AtomicUsize,
    pub renders: AtomicUsize,
    pub exports: AtomicUsize,
    pub retags: AtomicUsize,
    pub first_frames: AtomicUsize,
    pub plans: Mutex<Vec<ExportPlan>>,
}

impl FakeMedia {
    pub fn new(container: ContainerProbe) -> Self {
        Self {
            container: Mutex::new(container),
            keyframes: Mutex::new(Vec::new()),
            scene: Arc::new(|_| 128),
            still_side: Arc::new(|_| 16),
            fail_export: false,
            fail_renders: false,
            fail_first_frame: false,
            cancel_on_render: Mutex::new(None),
            probes: AtomicUsize::new(0),
            luma_samples: AtomicUsize::new(0),
            renders: AtomicUsize::new(0),
            exports: AtomicUsize::new(0),
            retags: AtomicUsize::new(0),
            first_frames: AtomicUsize::new(0),
            plans: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scene(mut self, scene: impl Fn(f64) -> u8 + Send + Sync + 'static) -> Self {
        self.scene = Arc::new(scene);
        self
    }

    pub fn with_keyframes(self, keyframes: Vec<f64>) -> Self {
        *self.keyframes.lock().unwrap() = keyframes;
        self
    }

    pub fn failing_export(mut self) -> Self {
        self.fail_export = true;
        self
    }

    pub fn with_still_side(mut self, side: impl Fn(f64) -> u32 + Send + Sync + 'static) -> Self {
        self.still_side = Arc::new(side);
        self
    }

    pub fn failing_renders(mut self) -> Self {
        self.fail_renders = true;
        self
    }

    /// Cancel the batch as soon as a still is rendered
    pub fn cancelling_on_render(self, handle: CancelHandle) -> Self {
        *self.cancel_on_render.lock().unwrap() = Some(handle);
        self
    }

    pub fn failing_first_frame(mut self) -> Self {
        self.fail_first_frame = true;
        self
    }

    pub fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }

    pub fn last_plan(&self) -> Option<ExportPlan> {
        self.plans.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MediaPort for FakeMedia {
    async fn probe(&self, _path: &Path) -> MediaResult<ContainerProbe> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.container.lock().unwrap().clone())
    }

    async fn keyframe_times(&self, _path: &Path, from: f64, to: f64) -> MediaResult<Vec<f64>> {
        Ok(self
            .keyframes
            .lock()
            .unwrap()
            .iter()
            .copied()
            .filter(|t| *t >= from && *t <= to)
            .collect())
    }

    async fn sample_luma(&self, _path: &Path, at: f64, size: Resolution) -> MediaResult<LumaFrame> {
        self.luma_samples.fetch_add(1, Ordering::SeqCst);
        let level = (self.scene)(at);
        let data = vec![level; size.width as usize * size.height as usize];
        LumaFrame::new(size.width, size.height, data).map_err(|e| MediaError::Unsupported(e.to_string()))
    }

    async fn render_still(&self, _path: &Path, at: f64, output: &Path) -> MediaResult<()> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail_renders {
            return Err(MediaError::ffmpeg_failed(
                format!("cannot seek to {:.3}s", at),
                Some("Invalid data found when processing input".to_string()),
                Some(1),
            ));
        }
        std::fs::write(output, sized_jpeg((self.scene)(at), (self.still_side)(at)))?;
        if let Some(handle) = self.cancel_on_render.lock().unwrap().as_ref() {
            handle.cancel();
        }
        Ok(())
    }

    async fn export_clip(&self, plan: &ExportPlan) -> MediaResult<()> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        self.plans.lock().unwrap().push(plan.clone());
        if self.fail_export {
            return Err(MediaError::ffmpeg_failed(
                "encoder rejected stream",
                Some("Error while opening encoder".to_string()),
                Some(1),
            ));
        }
        std::fs::write(&plan.output, quicktime::encode_movie_header(&plan.metadata))?;
        Ok(())
    }

    async fn retag_clip(
        &self,
        input: &Path,
        output: &Path,
        tags: &[(String, String)],
    ) -> MediaResult<()> {
        self.retags.fetch_add(1, Ordering::SeqCst);
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        std::fs::write(output, quicktime::encode_movie_header(tags))?;
        Ok(())
    }

    async fn extract_first_frame(&self, clip: &Path, output: &Path) -> MediaResult<()> {
        self.first_frames.fetch_add(1, Ordering::SeqCst);
        if self.fail_first_frame {
            return Err(MediaError::ffmpeg_failed(
                format!("cannot decode {}", clip.display()),
                None,
                Some(1),
            ));
        }
        std::fs::write(output, tiny_jpeg(128))?;
        Ok(())
    }
}

/// What the store saw in one paired write
#[derive(Debug, Clone)]
pub struct StoredWrite {
    pub request: PairedAssetRequest,
    pub verification: Option<PairVerification>,
    /// Still bytes as they were at write time
    pub image: Vec<u8>,
    pub accepted: bool,
}

/// Asset store recording every paired write
pub struct FakeStore {
    pub authorization: Authorization,
    /// Number of leading writes to reject
    pub reject_first: usize,
    pub writes: Mutex<Vec<StoredWrite>>,
    pub authorization_checks: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            authorization: Authorization::Authorized,
            reject_first: 0,
            writes: Mutex::new(Vec::new()),
            authorization_checks: AtomicUsize::new(0),
        }
    }

    pub fn denied(reason: &str) -> Self {
        Self {
            authorization: Authorization::Denied(reason.to_string()),
            ..Self::new()
        }
    }

    pub fn rejecting(count: usize) -> Self {
        Self {
            reject_first: count,
            ..Self::new()
        }
    }

    pub fn writes(&self) -> Vec<StoredWrite> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStorePort for FakeStore {
    async fn authorization(&self) -> Authorization {
        self.authorization_checks.fetch_add(1, Ordering::SeqCst);
        self.authorization.clone()
    }

    async fn create_paired_asset(&self, request: &PairedAssetRequest) -> MediaResult<AssetRecord> {
        let verification = PairingEngine::new()
            .read_pair(&request.image_path, &request.clip_path)
            .await
            .ok();
        let image = std::fs::read(&request.image_path).unwrap_or_default();
        let mut writes = self.writes.lock().unwrap();
        let accepted = writes.len() >= self.reject_first;
        writes.push(StoredWrite {
            request: request.clone(),
            verification,
            image,
            accepted,
        });
        if !accepted {
            return Err(MediaError::store("library is read-only"));
        }
        Ok(AssetRecord {
            id: format!("ASSET-{}", writes.len()),
            kind: request.kind,
            created_at: Utc::now(),
        })
    }
}

/// Log port keeping every line in memory
#[derive(Default)]
pub struct MemoryLog {
    pub lines: Mutex<Vec<(&'static str, String)>>,
}

impl MemoryLog {
    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

#[async_trait]
impl LogPort for MemoryLog {
    async fn info(&self, message: &str) {
        self.lines.lock().unwrap().push(("info", message.to_string()));
    }

    async fn warn(&self, message: &str) {
        self.lines.lock().unwrap().push(("warn", message.to_string()));
    }

    async fn error(&self, message: &str) {
        self.lines.lock().unwrap().push(("error", message.to_string()));
    }

    async fn debug(&self, message: &str) {
        self.lines.lock().unwrap().push(("debug", message.to_string()));
    }
}
