// Unit tests for domain models

use super::*;
use crate::domain::errors::*;

#[test]
fn test_quality_profile_durations() {
    assert_eq!(QualityProfile::High.max_duration_seconds(), 5.0);
    assert_eq!(QualityProfile::Balanced.max_duration_seconds(), 3.0);
    assert_eq!(QualityProfile::Fast.max_duration_seconds(), 2.0);
    assert_eq!(QualityProfile::Custom.max_duration_seconds(), 5.0);
}

#[test]
fn test_quality_profile_targets() {
    assert_eq!(
        QualityProfile::Balanced.settings().target_resolution,
        Some(Resolution::new(1280, 720))
    );
    let custom = QualityProfile::Custom.settings();
    assert_eq!(custom.target_resolution, None);
    assert_eq!(custom.export_preset, ExportPreset::Passthrough);
}

#[test]
fn test_quality_profile_parse() {
    assert_eq!(QualityProfile::parse("Balanced").unwrap(), QualityProfile::Balanced);
    assert_eq!(QualityProfile::parse(" fast ").unwrap(), QualityProfile::Fast);
    let err = QualityProfile::parse("ultra").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_quality_profile_display_round_trip() {
    for profile in QualityProfile::ALL {
        assert_eq!(QualityProfile::parse(&profile.to_string()).unwrap(), profile);
    }
}

#[test]
fn test_resolution_scaled_to_fit_landscape() {
    let source = Resolution::new(1920, 1080);
    assert_eq!(
        source.scaled_to_fit(&Resolution::new(1280, 720)),
        Resolution::new(1280, 720)
    );
}

#[test]
fn test_resolution_never_upscales() {
    let source = Resolution::new(640, 360);
    assert_eq!(source.scaled_to_fit(&Resolution::new(1280, 720)), source);
}

#[test]
fn test_resolution_scaled_dimensions_are_even() {
    let source = Resolution::new(1999, 1001);
    let scaled = source.scaled_to_fit(&Resolution::new(960, 540));
    assert_eq!(scaled.width % 2, 0);
    assert_eq!(scaled.height % 2, 0);
    assert!(scaled.fits_within(&Resolution::new(960, 540)));
}

#[test]
fn test_resolution_oriented_like_portrait() {
    let target = Resolution::new(1280, 720);
    let portrait = Resolution::new(1080, 1920);
    assert_eq!(target.oriented_like(&portrait), Resolution::new(720, 1280));
    assert_eq!(target.oriented_like(&Resolution::new(1920, 1080)), target);
}

#[test]
fn test_probe_display_size_rotated() {
    let probe = ProbeResult {
        duration_seconds: 4.0,
        native_size: Resolution::new(1920, 1080),
        frame_rate: 30.0,
        has_audio: true,
        track_format_count: 2,
        video_codec: "h264".to_string(),
        rotation: 90,
        file_size: 10_000,
    };
    assert_eq!(probe.display_size(), Resolution::new(1080, 1920));
    assert!((probe.frame_duration() - 1.0 / 30.0).abs() < 1e-9);
}

#[test]
fn test_time_range_validation() {
    assert!(TimeRange::new(0.0, 3.0, 10.0).is_ok());
    assert!(TimeRange::new(7.0, 3.0, 10.0).is_ok());
    assert!(TimeRange::new(7.5, 3.0, 10.0).is_err());
    assert!(TimeRange::new(-1.0, 3.0, 10.0).is_err());
    assert!(TimeRange::new(1.0, 0.0, 10.0).is_err());
}

#[test]
fn test_time_range_whole() {
    let range = TimeRange::whole(2.5);
    assert_eq!(range.start_seconds, 0.0);
    assert_eq!(range.duration_seconds, 2.5);
    assert_eq!(range.midpoint(), 1.25);
}

#[test]
fn test_still_image_time_string_form() {
    assert_eq!(StillImageTime::ZERO.to_metadata_string(), "0");
}

#[test]
fn test_export_preset_codec_support() {
    assert!(ExportPreset::Hd1280x720.supports_codec("hevc"));
    assert!(!ExportPreset::Hd1280x720.supports_codec("gif"));
    assert!(ExportPreset::Passthrough.supports_codec("anything"));
}

#[test]
fn test_luma_frame_size_check() {
    assert!(LumaFrame::new(2, 2, vec![0; 4]).is_ok());
    let err = LumaFrame::new(2, 2, vec![0; 3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ImageProcessingFailed);
}

#[test]
fn test_job_state_terminal() {
    assert!(!JobState::Exporting.is_terminal());
    assert!(JobState::Completed("id".into()).is_terminal());
    assert!(JobState::Cancelled.is_terminal());
}
