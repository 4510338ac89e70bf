//! Content pairing engine
//!
//! Mints the identifier shared by a still and its clip and writes it into
//! both halves: the still's Exif vendor block (see [`jpeg`]) and the clip's
//! QuickTime metadata (see [`quicktime`], written by the clip exporter).

pub mod jpeg;
pub mod quicktime;

use std::path::Path;

use tracing::debug;
use uuid::Uuid;

use crate::domain::model::{ContentIdentifier, StillImageTime};
use crate::domain::usecases::PairVerification;
use crate::error::{MediaError, MediaResult};

pub const KEY_LIVE_PHOTO: &str = "com.apple.quicktime.live-photo";
pub const KEY_CONTENT_IDENTIFIER: &str = "com.apple.quicktime.content.identifier";
pub const KEY_STILL_IMAGE_TIME: &str = "com.apple.quicktime.still-image-time";

/// Stateless pairing operations
#[derive(Debug, Default, Clone, Copy)]
pub struct PairingEngine;

impl PairingEngine {
    pub fn new() -> Self {
        Self
    }

    /// New random identifier, one per job
    pub fn mint_identifier(&self) -> ContentIdentifier {
        ContentIdentifier::new(Uuid::new_v4().to_string().to_uppercase())
    }

    /// Clip metadata entries for a live pair
    pub fn clip_tags(
        &self,
        id: &ContentIdentifier,
        still_image_time: StillImageTime,
    ) -> Vec<(String, String)> {
        vec![
            (KEY_LIVE_PHOTO.to_string(), "1".to_string()),
            (KEY_CONTENT_IDENTIFIER.to_string(), id.as_str().to_string()),
            (
                KEY_STILL_IMAGE_TIME.to_string(),
                still_image_time.to_metadata_string(),
            ),
        ]
    }

    /// Write a tagged copy of the JPEG at `source` to `output`
    pub async fn tag_still(
        &self,
        source: &Path,
        output: &Path,
        id: &ContentIdentifier,
        still_image_time: StillImageTime,
    ) -> MediaResult<()> {
        let bytes = tokio::fs::read(source).await?;
        let tagged = jpeg::embed(&bytes, id.as_str(), still_image_time.seconds())?;
        tokio::fs::write(output, tagged).await?;
        debug!(
            "Tagged still {} with content identifier {}",
            output.display(),
            id
        );
        Ok(())
    }

    /// Read the linkage fields back from a finished pair
    pub async fn read_pair(&self, image: &Path, clip: &Path) -> MediaResult<PairVerification> {
        let image_bytes = tokio::fs::read(image).await.map_err(|e| not_found(image, e))?;
        let clip_bytes = tokio::fs::read(clip).await.map_err(|e| not_found(clip, e))?;

        let still = jpeg::read(&image_bytes)?;
        let clip_meta = quicktime::read(&clip_bytes)?;

        Ok(PairVerification {
            image_content_id: still.as_ref().and_then(|s| s.content_identifier.clone()),
            clip_content_id: clip_meta.get(KEY_CONTENT_IDENTIFIER).map(str::to_string),
            image_still_time: still.and_then(|s| s.still_image_time),
            clip_still_time: clip_meta.get(KEY_STILL_IMAGE_TIME).map(str::to_string),
            live_photo_flag: clip_meta.get(KEY_LIVE_PHOTO) == Some("1"),
        })
    }
}

fn not_found(path: &Path, error: std::io::Error) -> MediaError {
    if error.kind() == std::io::ErrorKind::NotFound {
        MediaError::FileNotFound(path.to_path_buf())
    } else {
        MediaError::Io(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0x00, 0xFF, 0xD9]
    }

    #[test]
    fn test_identifiers_are_unique_uppercase_uuids() {
        let engine = PairingEngine::new();
        let a = engine.mint_identifier();
        let b = engine.mint_identifier();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert_eq!(a.as_str(), a.as_str().to_uppercase());
    }

    #[test]
    fn test_clip_tags_contract() {
        let engine = PairingEngine::new();
        let id = ContentIdentifier::new("ID-1");
        let tags = engine.clip_tags(&id, StillImageTime::ZERO);
        assert_eq!(
            tags,
            vec![
                (KEY_LIVE_PHOTO.to_string(), "1".to_string()),
                (KEY_CONTENT_IDENTIFIER.to_string(), "ID-1".to_string()),
                (KEY_STILL_IMAGE_TIME.to_string(), "0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_identifier_matches_across_halves() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.jpg");
        let image = dir.path().join("still.jpg");
        let clip = dir.path().join("clip.mov");

        let engine = PairingEngine::new();
        let id = engine.mint_identifier();
        std::fs::write(&raw, minimal_jpeg()).unwrap();
        engine
            .tag_still(&raw, &image, &id, StillImageTime::ZERO)
            .await
            .unwrap();
        let header = quicktime::encode_movie_header(&engine.clip_tags(&id, StillImageTime::ZERO));
        std::fs::write(&clip, header).unwrap();

        let check = engine.read_pair(&image, &clip).await.unwrap();
        assert!(check.is_linked());
        assert!(check.live_photo_flag);
        assert_eq!(check.image_content_id.as_deref(), Some(id.as_str()));
        assert_eq!(check.image_still_time, Some(0.0));
        assert_eq!(check.clip_still_time.as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn test_read_pair_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PairingEngine::new()
            .read_pair(&dir.path().join("a.jpg"), &dir.path().join("b.mov"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
