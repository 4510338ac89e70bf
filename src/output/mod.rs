//! Persistence of finished pairs into the asset store
//!
//! A pair is committed through three tiers tried in a fixed order:
//!
//! 1. **Primary**: the tagged still and clip with explicit type hints.
//! 2. **Backup**: fresh copies with the pairing metadata written again from
//!    scratch, stored without type hints. Attempted exactly once.
//! 3. **Ultra-simple**: the clip without any custom metadata and a still
//!    taken from its first frame, stored as a plain (unlinked) pair.
//!
//! Store writes from concurrent jobs are serialised through a shared gate.

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::domain::errors::DomainError;
use crate::domain::model::*;
use crate::domain::usecases::JobFailure;
use crate::error::MediaError;
use crate::pairing::PairingEngine;
use crate::ports::{AssetStorePort, LogPort, MediaPort, PairedAssetRequest};

pub mod verifier;

/// Gate serialising paired writes across a batch
pub type StoreGate = Arc<Mutex<()>>;

/// Why a tier did not produce an asset
#[derive(Debug)]
enum TierFailure {
    /// Files for the tier could not be produced
    Creation(MediaError),
    /// The store rejected the paired write
    Rejected(MediaError),
}

impl TierFailure {
    /// Terminal failure once no tier is left, raw error kept alongside
    fn into_failure(self) -> JobFailure {
        let (error, raw) = match self {
            TierFailure::Creation(e) => (DomainError::CreationFailed(e.to_string()), e),
            TierFailure::Rejected(e) => (DomainError::SaveFailed(e.to_string()), e),
        };
        JobFailure::new(error, Some(format!("{:?}", raw)))
    }
}

impl std::fmt::Display for TierFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierFailure::Creation(e) => write!(f, "could not prepare files: {}", e),
            TierFailure::Rejected(e) => write!(f, "store rejected write: {}", e),
        }
    }
}

/// Commits pairs with the three-tier fallback chain
pub struct PersistenceOrchestrator {
    store: Arc<dyn AssetStorePort>,
    media: Arc<dyn MediaPort>,
    log: Arc<dyn LogPort>,
    pairing: PairingEngine,
    gate: StoreGate,
    /// Parent of the per-tier scratch directories; system temp when unset
    scratch_parent: Option<PathBuf>,
}

impl PersistenceOrchestrator {
    pub fn new(
        store: Arc<dyn AssetStorePort>,
        media: Arc<dyn MediaPort>,
        log: Arc<dyn LogPort>,
        gate: StoreGate,
        scratch_parent: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            media,
            log,
            pairing: PairingEngine::new(),
            gate,
            scratch_parent,
        }
    }

    /// Store `pair`, falling back tier by tier.
    ///
    /// Exhausting every tier yields `SaveFailed` when the last store write was
    /// rejected and `CreationFailed` when the last tier could not produce its
    /// files.
    pub async fn persist(&self, pair: &MediaPair) -> Result<PersistOutcome, JobFailure> {
        let primary = match self.primary(pair).await {
            Ok(asset) => return Ok(self.done(asset, PersistTier::Primary, Linkage::Linked).await),
            Err(failure) => failure,
        };
        self.log
            .warn(&format!("Primary save failed, {}; trying backup", primary))
            .await;

        let backup = match self.backup(pair).await {
            Ok(asset) => return Ok(self.done(asset, PersistTier::Backup, Linkage::Linked).await),
            Err(failure) => failure,
        };
        self.log
            .warn(&format!(
                "Backup save failed, {}; storing an unlinked pair",
                backup
            ))
            .await;

        match self.ultra_simple(pair).await {
            Ok(asset) => Ok(self
                .done(asset, PersistTier::UltraSimple, Linkage::Degraded)
                .await),
            Err(failure) => {
                self.log
                    .error(&format!("Ultra-simple save failed, {}", failure))
                    .await;
                Err(failure.into_failure())
            }
        }
    }

    async fn done(&self, asset: AssetRecord, tier: PersistTier, linkage: Linkage) -> PersistOutcome {
        self.log
            .info(&format!("Stored asset {} via {} tier", asset.id, tier))
            .await;
        PersistOutcome {
            asset,
            tier,
            linkage,
        }
    }

    async fn primary(&self, pair: &MediaPair) -> Result<AssetRecord, TierFailure> {
        self.write(PairedAssetRequest {
            image_path: pair.image_path.clone(),
            clip_path: pair.clip_path.clone(),
            image_hint: Some(TypeHint::Jpeg),
            clip_hint: Some(TypeHint::QuickTimeMovie),
            kind: AssetKind::LivePair,
        })
        .await
    }

    async fn backup(&self, pair: &MediaPair) -> Result<AssetRecord, TierFailure> {
        let scratch = self.scratch_dir("backup").map_err(TierFailure::Creation)?;
        let image = scratch.path().join("backup.jpg");
        let clip = scratch.path().join("backup.mov");

        self.pairing
            .tag_still(
                &pair.image_path,
                &image,
                &pair.content_id,
                pair.still_image_time,
            )
            .await
            .map_err(TierFailure::Creation)?;
        let tags = self
            .pairing
            .clip_tags(&pair.content_id, pair.still_image_time);
        self.media
            .retag_clip(&pair.clip_path, &clip, &tags)
            .await
            .map_err(TierFailure::Creation)?;

        self.write(PairedAssetRequest {
            image_path: image,
            clip_path: clip,
            image_hint: None,
            clip_hint: None,
            kind: AssetKind::LivePair,
        })
        .await
    }

    async fn ultra_simple(&self, pair: &MediaPair) -> Result<AssetRecord, TierFailure> {
        let scratch = self.scratch_dir("plain").map_err(TierFailure::Creation)?;
        let image = scratch.path().join("plain.jpg");
        let clip = scratch.path().join("plain.mov");

        self.media
            .retag_clip(&pair.clip_path, &clip, &[])
            .await
            .map_err(TierFailure::Creation)?;
        self.media
            .extract_first_frame(&clip, &image)
            .await
            .map_err(TierFailure::Creation)?;

        self.write(PairedAssetRequest {
            image_path: image,
            clip_path: clip,
            image_hint: None,
            clip_hint: None,
            kind: AssetKind::PlainPair,
        })
        .await
    }

    async fn write(&self, request: PairedAssetRequest) -> Result<AssetRecord, TierFailure> {
        let _permit = self.gate.lock().await;
        self.store
            .create_paired_asset(&request)
            .await
            .map_err(TierFailure::Rejected)
    }

    /// Temporary directory removed when the tier finishes
    fn scratch_dir(&self, label: &str) -> Result<TempDir, MediaError> {
        let prefix = format!("livepair-{}-", label);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        Ok(scratch_in(&builder, self.scratch_parent.as_deref())?)
    }
}

/// Create a scratch directory under `parent`, or the system temp dir
pub(crate) fn scratch_in(
    builder: &tempfile::Builder<'_, '_>,
    parent: Option<&std::path::Path>,
) -> std::io::Result<TempDir> {
    match parent {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    }
}

