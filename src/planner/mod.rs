//! Segment selection and GOP analysis module

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::{MotionScorer, SegmentSearch};
use crate::engine::still::luma_grid_for;
use crate::ports::{LogPort, MediaPort};

pub mod gop;

/// Chosen clip range and how it was found
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSelection {
    pub range: TimeRange,
    /// Motion score of the chosen window, absent when no search ran
    pub motion_score: Option<f64>,
    pub windows_scored: usize,
}

/// Finds the most visually stable sub-range of a source
pub struct SegmentSelector {
    media: Arc<dyn MediaPort>,
    log: Arc<dyn LogPort>,
}

/// Decoded frames keyed by timestamp in milliseconds. `None` marks an
/// instant that failed to decode.
type FrameCache = HashMap<i64, Option<LumaFrame>>;

impl SegmentSelector {
    pub fn new(media: Arc<dyn MediaPort>, log: Arc<dyn LogPort>) -> Self {
        Self { media, log }
    }

    /// Pick the window of `max_duration` with the least motion. Sources no
    /// longer than `max_duration` are used whole.
    pub async fn select(
        &self,
        source: &SourceVideo,
        probe: &ProbeResult,
        max_duration: f64,
    ) -> Result<SegmentSelection, DomainError> {
        if probe.duration_seconds <= max_duration {
            return Ok(SegmentSelection {
                range: TimeRange::whole(probe.duration_seconds),
                motion_score: None,
                windows_scored: 0,
            });
        }

        let grid = luma_grid_for(probe.display_size());
        let mut cache = FrameCache::new();
        let mut scored = Vec::new();

        for start in SegmentSearch::candidate_starts(probe.duration_seconds, max_duration) {
            let times = SegmentSearch::sample_times(start, max_duration, FRAMES_PER_WINDOW);
            let mut frames = Vec::with_capacity(times.len());
            for at in times {
                match self.frame_at(source, at, grid, &mut cache).await {
                    Some(frame) => frames.push(frame),
                    None => break,
                }
            }
            if frames.len() < FRAMES_PER_WINDOW {
                self.log
                    .warn(&format!(
                        "Skipping window at {:.1}s of {}: frames could not be decoded",
                        start,
                        source.display_name()
                    ))
                    .await;
                continue;
            }
            if let Some(score) = MotionScorer::window_score(&frames) {
                self.log
                    .debug(&format!("Window at {:.1}s motion score {:.3}", start, score))
                    .await;
                scored.push((start, score));
            }
        }

        let (start, motion_score) = match SegmentSearch::most_stable(&scored) {
            Some(start) => {
                let score = scored.iter().find(|(s, _)| *s == start).map(|(_, v)| *v);
                (start, score)
            }
            None => {
                self.log
                    .warn(&format!(
                        "No window of {} could be scored, using the start of the video",
                        source.display_name()
                    ))
                    .await;
                (0.0, None)
            }
        };

        let range = TimeRange::new(start, max_duration, probe.duration_seconds)?;
        self.log
            .info(&format!(
                "Selected segment {} of {}",
                range,
                source.display_name()
            ))
            .await;
        Ok(SegmentSelection {
            range,
            motion_score,
            windows_scored: scored.len(),
        })
    }

    async fn frame_at(
        &self,
        source: &SourceVideo,
        at: f64,
        grid: Resolution,
        cache: &mut FrameCache,
    ) -> Option<LumaFrame> {
        let key = (at * 1000.0).round() as i64;
        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }
        let frame = match self.media.sample_luma(source.path(), at, grid).await {
            Ok(frame) => Some(frame),
            Err(e) => {
                self.log
                    .debug(&format!("Frame at {:.3}s failed to decode: {}", at, e))
                    .await;
                None
            }
        };
        cache.insert(key, frame.clone());
        frame
    }
}
