//! Verification of a finished still/clip pair

use std::path::Path;

use tracing::{info, warn};

use crate::domain::errors::{DomainError, ErrorClassifier, Phase};
use crate::domain::usecases::PairVerification;
use crate::pairing::PairingEngine;

/// Reads the linkage fields of a stored pair back
#[derive(Debug, Default, Clone, Copy)]
pub struct PairVerifier {
    pairing: PairingEngine,
}

impl PairVerifier {
    pub fn new() -> Self {
        Self {
            pairing: PairingEngine::new(),
        }
    }

    /// Read both halves and report what links them
    pub async fn verify(&self, image: &Path, clip: &Path) -> Result<PairVerification, DomainError> {
        info!("Verifying pair {} + {}", image.display(), clip.display());

        let verification = self
            .pairing
            .read_pair(image, clip)
            .await
            .map_err(|e| ErrorClassifier::lift(Phase::Validation, &e))?;

        if verification.is_linked() {
            info!(
                "Pair linked by content identifier {}",
                verification.image_content_id.as_deref().unwrap_or_default()
            );
        } else {
            warn!(
                "Pair is not linked: image id {:?}, clip id {:?}, live-photo flag {}",
                verification.image_content_id,
                verification.clip_content_id,
                verification.live_photo_flag
            );
        }
        Ok(verification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ContentIdentifier, StillImageTime};
    use crate::pairing::{jpeg, quicktime};

    #[tokio::test]
    async fn test_unlinked_pair_reported() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.jpg");
        let clip = dir.path().join("a.mov");
        let engine = PairingEngine::new();

        let tagged = jpeg::embed(&[0xFF, 0xD8, 0xFF, 0xD9], "AAA", 0.0).unwrap();
        std::fs::write(&image, tagged).unwrap();
        let tags = engine.clip_tags(&ContentIdentifier::new("BBB"), StillImageTime::ZERO);
        std::fs::write(&clip, quicktime::encode_movie_header(&tags)).unwrap();

        let result = PairVerifier::new().verify(&image, &clip).await.unwrap();
        assert!(!result.is_linked());
        assert_eq!(result.image_content_id.as_deref(), Some("AAA"));
        assert_eq!(result.clip_content_id.as_deref(), Some("BBB"));
    }

    #[tokio::test]
    async fn test_missing_image_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = PairVerifier::new()
            .verify(&dir.path().join("none.jpg"), &dir.path().join("none.mov"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::FileNotFound(_)));
    }
}
