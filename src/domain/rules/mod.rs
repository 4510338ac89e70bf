// Business rules - Pure scoring and selection logic

use crate::domain::errors::DomainError;
use crate::domain::model::*;


/// Upper bound on pixels compared per frame pair
const MOTION_SAMPLE_BUDGET: usize = 1024;
/// Mean adjacent-pixel delta that counts as fully sharp
const SHARPNESS_FULL_SCALE: f64 = 40.0;
/// Brightness target for still candidates
const MID_GRAY: f64 = 128.0;

pub const CENTERING_WEIGHT: f64 = 0.3;
pub const SHARPNESS_WEIGHT: f64 = 0.4;
pub const BRIGHTNESS_WEIGHT: f64 = 0.3;

/// Motion scoring between sampled frames. Lower is more stable.
pub struct MotionScorer;

impl MotionScorer {
    /// Average absolute difference over a strided sample of the pixels both
    /// frames share. Memory use does not depend on frame size.
    pub fn frame_difference(a: &LumaFrame, b: &LumaFrame) -> f64 {
        let width = a.width.min(b.width);
        let height = a.height.min(b.height);
        let total = width as usize * height as usize;
        if total == 0 {
            return 0.0;
        }

        let stride = (total / MOTION_SAMPLE_BUDGET).max(1);
        let mut sum = 0u64;
        let mut count = 0u64;
        let mut index = 0usize;
        while index < total {
            let x = (index % width as usize) as u32;
            let y = (index / width as usize) as u32;
            sum += (a.pixel(x, y) as i32 - b.pixel(x, y) as i32).unsigned_abs() as u64;
            count += 1;
            index += stride;
        }
        sum as f64 / count as f64
    }

    /// Mean of the differences between consecutive frames of a window
    pub fn window_score(frames: &[LumaFrame]) -> Option<f64> {
        if frames.len() < 2 {
            return None;
        }
        let diffs: Vec<f64> = frames
            .windows(2)
            .map(|pair| Self::frame_difference(&pair[0], &pair[1]))
            .collect();
        Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
    }
}

/// Candidate windows for the stability search
pub struct SegmentSearch;

impl SegmentSearch {
    /// Window starts in fixed steps across the scanned prefix of the source.
    /// Empty when the whole source fits in one window.
    pub fn candidate_starts(source_duration: f64, max_duration: f64) -> Vec<f64> {
        if source_duration <= max_duration {
            return Vec::new();
        }
        let limit = source_duration.min(SEGMENT_SCAN_LIMIT_SECONDS) - max_duration;
        if limit < 0.0 {
            return vec![0.0];
        }
        let steps = (limit / SEGMENT_SCAN_STEP_SECONDS + 1e-9).floor() as usize;
        (0..=steps)
            .map(|k| k as f64 * SEGMENT_SCAN_STEP_SECONDS)
            .collect()
    }

    /// Evenly spaced sample instants inside a window
    pub fn sample_times(start: f64, duration: f64, count: usize) -> Vec<f64> {
        (0..count)
            .map(|i| start + duration * (i as f64 + 0.5) / count as f64)
            .collect()
    }

    /// Start of the window with the lowest score; the earliest start wins a tie.
    /// Expects `scored` ordered by ascending start.
    pub fn most_stable(scored: &[(f64, f64)]) -> Option<f64> {
        let mut best: Option<(f64, f64)> = None;
        for &(start, score) in scored {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, best_score)) if score >= best_score => {}
                _ => best = Some((start, score)),
            }
        }
        best.map(|(start, _)| start)
    }
}

/// Quality scoring for still image candidates
pub struct FrameQuality;

impl FrameQuality {
    /// High-frequency content approximated by sampled neighbour deltas, 0..=1
    pub fn sharpness(frame: &LumaFrame) -> f64 {
        if frame.width < 2 || frame.height < 2 {
            return 0.0;
        }
        let total = frame.width as usize * frame.height as usize;
        let stride = (total / MOTION_SAMPLE_BUDGET).max(1);
        let mut sum = 0u64;
        let mut count = 0u64;
        let mut index = 0usize;
        while index < total {
            let x = (index % frame.width as usize) as u32;
            let y = (index / frame.width as usize) as u32;
            if x + 1 < frame.width && y + 1 < frame.height {
                let here = frame.pixel(x, y) as i32;
                sum += (here - frame.pixel(x + 1, y) as i32).unsigned_abs() as u64;
                sum += (here - frame.pixel(x, y + 1) as i32).unsigned_abs() as u64;
                count += 2;
            }
            index += stride;
        }
        if count == 0 {
            return 0.0;
        }
        ((sum as f64 / count as f64) / SHARPNESS_FULL_SCALE).min(1.0)
    }

    /// Closeness of mean luma to mid-gray, 0..=1
    pub fn brightness(frame: &LumaFrame) -> f64 {
        if frame.data.is_empty() {
            return 0.0;
        }
        let mean = frame.data.iter().map(|&v| v as u64).sum::<u64>() as f64
            / frame.data.len() as f64;
        (1.0 - (mean - MID_GRAY).abs() / MID_GRAY).clamp(0.0, 1.0)
    }

    /// Closeness of an instant to the middle of the range, 0..=1
    pub fn centering(at: f64, range: &TimeRange) -> f64 {
        let half = range.duration_seconds / 2.0;
        if half <= 0.0 {
            return 1.0;
        }
        1.0 - ((at - range.midpoint()).abs() / half).min(1.0)
    }

    pub fn composite(centering: f64, sharpness: f64, brightness: f64) -> f64 {
        CENTERING_WEIGHT * centering + SHARPNESS_WEIGHT * sharpness + BRIGHTNESS_WEIGHT * brightness
    }

    /// Instants considered for the still. A single candidate is the range start.
    pub fn candidate_offsets(range: &TimeRange, count: usize) -> Vec<f64> {
        if count <= 1 {
            return vec![range.start_seconds];
        }
        (0..count)
            .map(|i| range.start_seconds + range.duration_seconds * i as f64 / count as f64)
            .collect()
    }
}

/// Source checks used by the quick compatibility path
pub struct CompatibilityRules;

impl CompatibilityRules {
    pub fn check_file_size(size: u64) -> Option<DomainError> {
        if size < MIN_SOURCE_FILE_BYTES {
            Some(DomainError::FileTooSmall(format!(
                "{} bytes (minimum {} bytes)",
                size, MIN_SOURCE_FILE_BYTES
            )))
        } else {
            None
        }
    }

    pub fn check_duration(duration_seconds: f64) -> Option<DomainError> {
        if duration_seconds < MIN_RECOMMENDED_DURATION_SECONDS {
            Some(DomainError::VideoTooShort(format!(
                "{:.2}s (recommended at least {:.1}s)",
                duration_seconds, MIN_RECOMMENDED_DURATION_SECONDS
            )))
        } else {
            None
        }
    }
}
