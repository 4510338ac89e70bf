//! FFprobe adapter for media file probing
//!
//! Parses `ffprobe -print_format json` output into a [`ContainerProbe`] and
//! lists keyframe timestamps for stream copy decisions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::model::Resolution;
use crate::engine::command::{Tool, ToolRunner};
use crate::error::{MediaError, MediaResult};
use crate::ports::{ContainerProbe, VideoTrackInfo};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
}

#[derive(Debug, Deserialize)]
struct FfprobeSideData {
    side_data_type: Option<String>,
    rotation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFrames {
    #[serde(default)]
    frames: Vec<FfprobeFrame>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFrame {
    pts_time: Option<String>,
    best_effort_timestamp_time: Option<String>,
}

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    runner: ToolRunner,
}

impl FfprobeAdapter {
    pub fn new(ffprobe_path: Option<PathBuf>) -> Self {
        Self {
            runner: ToolRunner::new(Tool::Ffprobe, ffprobe_path),
        }
    }

    /// Describe the streams of a container
    pub async fn probe(&self, path: &Path) -> MediaResult<ContainerProbe> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let stdout = self.runner.run_args(&args).await?;
        parse_probe_output(&stdout)
    }

    /// Keyframe timestamps of the first video stream in `[from, to]`
    pub async fn keyframe_times(&self, path: &Path, from: f64, to: f64) -> MediaResult<Vec<f64>> {
        let from = from.max(0.0);
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-skip_frame".to_string(),
            "nokey".to_string(),
            "-read_intervals".to_string(),
            format!("{:.3}%{:.3}", from, to),
            "-show_entries".to_string(),
            "frame=pts_time,best_effort_timestamp_time".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            path.to_string_lossy().to_string(),
        ];
        let stdout = self.runner.run_args(&args).await?;
        let parsed: FfprobeFrames = serde_json::from_slice(&stdout)?;
        let mut times: Vec<f64> = parsed
            .frames
            .iter()
            .filter_map(|f| {
                f.pts_time
                    .as_deref()
                    .or(f.best_effort_timestamp_time.as_deref())
                    .and_then(|t| t.parse::<f64>().ok())
            })
            .filter(|t| *t >= from - 1e-6 && *t <= to + 1e-6)
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        Ok(times)
    }
}

/// Parse the JSON printed by `ffprobe -show_format -show_streams`
fn parse_probe_output(stdout: &[u8]) -> MediaResult<ContainerProbe> {
    let parsed: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());
    let stream_duration = video
        .and_then(|s| s.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());
    let duration_seconds = format_duration.or(stream_duration).unwrap_or(0.0);

    let file_size = parsed
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    let video = match video {
        Some(stream) => Some(VideoTrackInfo {
            size: Resolution::new(
                stream.width.ok_or_else(|| MediaError::Unsupported("Video stream has no width".into()))?,
                stream
                    .height
                    .ok_or_else(|| MediaError::Unsupported("Video stream has no height".into()))?,
            ),
            frame_rate: stream
                .avg_frame_rate
                .as_deref()
                .and_then(parse_frame_rate)
                .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
                .unwrap_or(30.0),
            codec: stream.codec_name.clone().unwrap_or_else(|| "unknown".to_string()),
            rotation: stream_rotation(stream),
        }),
        None => None,
    };

    Ok(ContainerProbe {
        duration_seconds,
        file_size,
        track_format_count: parsed.streams.len(),
        has_audio,
        video,
    })
}

/// Parse "30000/1001" or "30" style rates. Zero or invalid rates are `None`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Clockwise display rotation of a stream. The display matrix side data
/// holds a counter-clockwise angle; the legacy `rotate` tag is clockwise.
fn stream_rotation(stream: &FfprobeStream) -> i32 {
    let from_matrix = stream
        .side_data_list
        .iter()
        .find(|d| d.side_data_type.as_deref() == Some("Display Matrix"))
        .and_then(|d| d.rotation)
        .map(|ccw| -ccw);
    let from_tag = stream
        .tags
        .get("rotate")
        .and_then(|r| r.trim().parse::<f64>().ok());
    normalize_rotation(from_matrix.or(from_tag).unwrap_or(0.0))
}

fn normalize_rotation(degrees: f64) -> i32 {
    let quarter_turns = (degrees / 90.0).round() as i64;
    (quarter_turns.rem_euclid(4) * 90) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_PROBE: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "hevc",
                "codec_type": "video",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30/1",
                "avg_frame_rate": "30000/1001",
                "duration": "10.010000",
                "tags": {"language": "und"},
                "side_data_list": [
                    {"side_data_type": "Display Matrix", "rotation": -90}
                ]
            },
            {"index": 1, "codec_name": "aac", "codec_type": "audio"},
            {"index": 2, "codec_type": "data", "codec_name": "none"}
        ],
        "format": {"duration": "10.033000", "size": "2345678"}
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let probe = parse_probe_output(IPHONE_PROBE.as_bytes()).unwrap();
        assert!((probe.duration_seconds - 10.033).abs() < 1e-9);
        assert_eq!(probe.file_size, 2_345_678);
        assert_eq!(probe.track_format_count, 3);
        assert!(probe.has_audio);
        let video = probe.video.unwrap();
        assert_eq!(video.size, Resolution::new(1920, 1080));
        assert_eq!(video.codec, "hevc");
        assert_eq!(video.rotation, 90);
        assert!((video.frame_rate - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_audio_only() {
        let json = r#"{"streams":[{"codec_type":"audio","codec_name":"mp3"}],"format":{"duration":"3.0"}}"#;
        let probe = parse_probe_output(json.as_bytes()).unwrap();
        assert!(probe.video.is_none());
        assert!(probe.has_audio);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::Json(_))
        ));
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_rotation_normalization() {
        assert_eq!(normalize_rotation(-90.0), 270);
        assert_eq!(normalize_rotation(90.0), 90);
        assert_eq!(normalize_rotation(180.0), 180);
        assert_eq!(normalize_rotation(-180.0), 180);
        assert_eq!(normalize_rotation(450.0), 90);
    }
}
