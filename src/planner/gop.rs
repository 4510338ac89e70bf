//! GOP (Group of Pictures) alignment checks

use serde::Serialize;

/// Keyframes around a cut point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyframeInfo {
    /// Nearest keyframe at or before the cut
    pub start_keyframe: Option<f64>,
    /// Nearest keyframe after the cut
    pub next_keyframe: Option<f64>,
}

/// GOP analyzer for stream copy decisions
pub struct GOPAnalyzer;

impl GOPAnalyzer {
    /// Locate the keyframes surrounding `cut` in a list of keyframe times
    pub fn around(keyframes: &[f64], cut: f64) -> KeyframeInfo {
        let mut start_keyframe: Option<f64> = None;
        let mut next_keyframe: Option<f64> = None;
        for &time in keyframes {
            if time <= cut {
                if start_keyframe.map_or(true, |best| time > best) {
                    start_keyframe = Some(time);
                }
            } else if next_keyframe.map_or(true, |best| time < best) {
                next_keyframe = Some(time);
            }
        }
        KeyframeInfo {
            start_keyframe,
            next_keyframe,
        }
    }

    /// Whether a stream copy starting at `cut` begins on a keyframe.
    /// `tolerance` is usually half a frame.
    pub fn is_aligned(keyframes: &[f64], cut: f64, tolerance: f64) -> bool {
        if cut <= tolerance {
            return true;
        }
        keyframes.iter().any(|&time| (time - cut).abs() <= tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_around_finds_neighbours() {
        let info = GOPAnalyzer::around(&[0.0, 2.0, 4.0, 6.0], 3.0);
        assert_eq!(info.start_keyframe, Some(2.0));
        assert_eq!(info.next_keyframe, Some(4.0));
    }

    #[test]
    fn test_around_without_keyframes() {
        let info = GOPAnalyzer::around(&[], 1.0);
        assert_eq!(info.start_keyframe, None);
        assert_eq!(info.next_keyframe, None);
    }

    #[test]
    fn test_alignment() {
        let keyframes = [0.0, 2.0, 4.0];
        assert!(GOPAnalyzer::is_aligned(&keyframes, 0.0, 0.016));
        assert!(GOPAnalyzer::is_aligned(&keyframes, 2.01, 0.016));
        assert!(!GOPAnalyzer::is_aligned(&keyframes, 3.0, 0.016));
        // Source start is always decodable
        assert!(GOPAnalyzer::is_aligned(&[], 0.0, 0.016));
    }
}
