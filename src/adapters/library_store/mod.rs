//! Directory-backed asset store
//!
//! Every asset is a directory named by its id holding the still, the clip and
//! an `asset.json` manifest. Writes are staged in a hidden directory and
//! renamed into place, so a reader never sees half an asset.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::model::*;
use crate::error::{MediaError, MediaResult};
use crate::pairing::{jpeg, quicktime};
use crate::ports::*;

pub const MANIFEST_FILE: &str = "asset.json";
const STAGING_PREFIX: &str = ".staging-";
/// Bytes read to check a resource signature
const SIGNATURE_LEN: usize = 16;

/// Manifest written next to the resources of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    #[serde(flatten)]
    pub record: AssetRecord,
    pub image_file: String,
    pub clip_file: String,
    pub image_type: Option<String>,
    pub clip_type: Option<String>,
}

/// Asset store writing into a library directory
#[derive(Debug, Clone)]
pub struct DirectoryAssetStore {
    root: PathBuf,
}

impl DirectoryAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Manifest of a stored asset
    pub async fn manifest(&self, id: &str) -> MediaResult<AssetManifest> {
        let bytes = tokio::fs::read(self.root.join(id).join(MANIFEST_FILE)).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_staged(
        &self,
        staging: &Path,
        request: &PairedAssetRequest,
        record: &AssetRecord,
    ) -> MediaResult<()> {
        tokio::fs::create_dir_all(staging).await?;

        let image_file = resource_name(&record.id, &request.image_path, request.image_hint);
        let clip_file = resource_name(&record.id, &request.clip_path, request.clip_hint);
        tokio::fs::copy(&request.image_path, staging.join(&image_file)).await?;
        tokio::fs::copy(&request.clip_path, staging.join(&clip_file)).await?;

        let manifest = AssetManifest {
            record: record.clone(),
            image_file,
            clip_file,
            image_type: request.image_hint.map(|h| h.mime_type().to_string()),
            clip_type: request.clip_hint.map(|h| h.mime_type().to_string()),
        };
        tokio::fs::write(
            staging.join(MANIFEST_FILE),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .await?;

        tokio::fs::rename(staging, self.root.join(&record.id)).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetStorePort for DirectoryAssetStore {
    async fn authorization(&self) -> Authorization {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            return Authorization::Denied(format!(
                "Cannot create library {}: {}",
                self.root.display(),
                e
            ));
        }
        let probe = self
            .root
            .join(format!(".livepair-access-{}", Uuid::new_v4().simple()));
        match tokio::fs::write(&probe, b"").await {
            Ok(()) => {
                let _ = tokio::fs::remove_file(&probe).await;
                Authorization::Authorized
            }
            Err(e) => Authorization::Denied(format!(
                "Library {} is not writable: {}",
                self.root.display(),
                e
            )),
        }
    }

    async fn create_paired_asset(&self, request: &PairedAssetRequest) -> MediaResult<AssetRecord> {
        check_hint(&request.image_path, request.image_hint).await?;
        check_hint(&request.clip_path, request.clip_hint).await?;

        let record = AssetRecord {
            id: Uuid::new_v4().to_string().to_uppercase(),
            kind: request.kind,
            created_at: Utc::now(),
        };
        let staging = self.root.join(format!("{}{}", STAGING_PREFIX, record.id));

        match self.write_staged(&staging, request, &record).await {
            Ok(()) => {
                debug!("Stored asset {} in {}", record.id, self.root.display());
                Ok(record)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_dir_all(&staging).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!("Failed to clean staging {}: {}", staging.display(), cleanup);
                    }
                }
                Err(MediaError::store(format!("Paired write failed: {}", e)))
            }
        }
    }
}

/// File name of a stored resource: the asset id plus the hinted extension,
/// or the source extension without a hint
fn resource_name(id: &str, source: &Path, hint: Option<TypeHint>) -> String {
    let extension = match hint {
        Some(hint) => hint.extension().to_string(),
        None => source
            .extension()
            .map(|e| e.to_string_lossy().to_uppercase())
            .unwrap_or_else(|| "BIN".to_string()),
    };
    format!("{}.{}", id, extension)
}

/// Reject a resource whose content does not match its type hint
async fn check_hint(path: &Path, hint: Option<TypeHint>) -> MediaResult<()> {
    let Some(hint) = hint else {
        return Ok(());
    };
    let head = read_signature(path)
        .await
        .map_err(|e| MediaError::store(format!("Cannot read {}: {}", path.display(), e)))?;
    let matches = match hint {
        TypeHint::Jpeg => jpeg::looks_like_jpeg(&head),
        TypeHint::QuickTimeMovie => quicktime::looks_like_quicktime(&head),
    };
    if matches {
        Ok(())
    } else {
        Err(MediaError::store(format!(
            "{} does not match type hint {}",
            path.display(),
            hint.mime_type()
        )))
    }
}

/// Leading bytes of `path`, at most `SIGNATURE_LEN` of them
async fn read_signature(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut head = Vec::with_capacity(SIGNATURE_LEN);
    file.take(SIGNATURE_LEN as u64).read_to_end(&mut head).await?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pair(dir: &Path) -> (PathBuf, PathBuf) {
        let image = dir.join("still.jpg");
        let clip = dir.join("clip.mov");
        std::fs::write(&image, [0xFF, 0xD8, 0xFF, 0xDA, 0x00, 0x02, 0xFF, 0xD9]).unwrap();
        std::fs::write(&clip, quicktime::encode_movie_header(&[])).unwrap();
        (image, clip)
    }

    #[tokio::test]
    async fn test_paired_write_creates_asset_directory() {
        let work = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let (image, clip) = write_pair(work.path());
        let store = DirectoryAssetStore::new(library.path());

        assert_eq!(store.authorization().await, Authorization::Authorized);
        let record = store
            .create_paired_asset(&PairedAssetRequest {
                image_path: image,
                clip_path: clip,
                image_hint: Some(TypeHint::Jpeg),
                clip_hint: Some(TypeHint::QuickTimeMovie),
                kind: AssetKind::LivePair,
            })
            .await
            .unwrap();

        let dir = library.path().join(&record.id);
        assert!(dir.join(format!("{}.JPG", record.id)).exists());
        assert!(dir.join(format!("{}.MOV", record.id)).exists());
        let manifest = store.manifest(&record.id).await.unwrap();
        assert_eq!(manifest.record, record);
        assert_eq!(manifest.clip_type.as_deref(), Some("video/quicktime"));
    }

    #[tokio::test]
    async fn test_hint_mismatch_rejected_without_leftovers() {
        let work = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let (image, clip) = write_pair(work.path());
        let store = DirectoryAssetStore::new(library.path());

        let err = store
            .create_paired_asset(&PairedAssetRequest {
                image_path: clip,
                clip_path: image,
                image_hint: Some(TypeHint::Jpeg),
                clip_hint: Some(TypeHint::QuickTimeMovie),
                kind: AssetKind::LivePair,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Store { .. }));
        assert_eq!(std::fs::read_dir(library.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_resource_cleans_staging() {
        let work = tempfile::tempdir().unwrap();
        let library = tempfile::tempdir().unwrap();
        let (image, _) = write_pair(work.path());
        let store = DirectoryAssetStore::new(library.path());

        let result = store
            .create_paired_asset(&PairedAssetRequest {
                image_path: image,
                clip_path: work.path().join("missing.mov"),
                image_hint: None,
                clip_hint: None,
                kind: AssetKind::PlainPair,
            })
            .await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(library.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_resource_name_without_hint_uses_source_extension() {
        assert_eq!(
            resource_name("ID", Path::new("/tmp/frame.jpeg"), None),
            "ID.JPEG"
        );
        assert_eq!(
            resource_name("ID", Path::new("/tmp/clip.mov"), Some(TypeHint::QuickTimeMovie)),
            "ID.MOV"
        );
    }

    #[tokio::test]
    async fn test_signature_reads_only_the_leading_bytes() {
        let work = tempfile::tempdir().unwrap();
        let path = work.path().join("large.jpg");
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xDA];
        bytes.resize(4 * 1024 * 1024, 0x55);
        std::fs::write(&path, &bytes).unwrap();

        let head = read_signature(&path).await.unwrap();
        assert_eq!(head.len(), SIGNATURE_LEN);
        assert_eq!(head[..], bytes[..SIGNATURE_LEN]);
        assert!(check_hint(&path, Some(TypeHint::Jpeg)).await.is_ok());
        assert!(check_hint(&path, Some(TypeHint::QuickTimeMovie)).await.is_err());
    }

    #[tokio::test]
    async fn test_signature_of_short_file_is_whole_file() {
        let work = tempfile::tempdir().unwrap();
        let path = work.path().join("short.jpg");
        std::fs::write(&path, [0xFF, 0xD8]).unwrap();
        assert_eq!(read_signature(&path).await.unwrap(), vec![0xFF, 0xD8]);
    }
}
