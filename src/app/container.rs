use std::sync::Arc;

use crate::adapters::toml_config::ConverterConfig;
use crate::adapters::{DirectoryAssetStore, FfmpegMediaAdapter, TracingLogAdapter};
use crate::app::{
    convert_interactor::{ConvertInteractor, ConvertSettings},
    inspect_interactor::InspectInteractor,
    verify_interactor::VerifyInteractor,
};
use crate::domain::errors::DomainError;
use crate::ports::{AssetStorePort, LogPort, MediaPort};

pub trait AppContainer: Send + Sync {
    fn convert_interactor(&self) -> Arc<ConvertInteractor>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
    fn verify_interactor(&self) -> Arc<VerifyInteractor>;
}

pub struct DefaultAppContainer {
    convert_interactor: Arc<ConvertInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
    verify_interactor: Arc<VerifyInteractor>,
}

impl DefaultAppContainer {
    /// Wire the production adapters from a validated configuration
    pub fn new(config: &ConverterConfig) -> Result<Self, DomainError> {
        config.validate()?;

        let media_port = Arc::new(FfmpegMediaAdapter::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
        ));
        let store_port = Arc::new(DirectoryAssetStore::new(config.library_dir.clone()));
        let log_port = Arc::new(TracingLogAdapter::default());

        Ok(Self::with_ports(
            media_port,
            store_port,
            log_port,
            ConvertSettings::from(config),
        ))
    }

    /// Wire interactors around the given ports
    pub fn with_ports(
        media_port: Arc<dyn MediaPort>,
        store_port: Arc<dyn AssetStorePort>,
        log_port: Arc<dyn LogPort>,
        settings: ConvertSettings,
    ) -> Self {
        let convert_interactor = Arc::new(ConvertInteractor::new(
            Arc::clone(&media_port),
            Arc::clone(&store_port),
            Arc::clone(&log_port),
            settings,
        ));

        let inspect_interactor = Arc::new(InspectInteractor::new(
            Arc::clone(&media_port),
            Arc::clone(&log_port),
        ));

        let verify_interactor = Arc::new(VerifyInteractor::new(Arc::clone(&log_port)));

        Self {
            convert_interactor,
            inspect_interactor,
            verify_interactor,
        }
    }
}

impl From<&ConverterConfig> for ConvertSettings {
    fn from(config: &ConverterConfig) -> Self {
        Self {
            max_concurrent_jobs: config.max_concurrent_jobs,
            include_audio: config.include_audio,
            still_candidates: config.still_candidates,
            scratch_dir: config.scratch_dir.clone(),
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn convert_interactor(&self) -> Arc<ConvertInteractor> {
        Arc::clone(&self.convert_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }

    fn verify_interactor(&self) -> Arc<VerifyInteractor> {
        Arc::clone(&self.verify_interactor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_follow_config() {
        let config = ConverterConfig {
            max_concurrent_jobs: 3,
            include_audio: false,
            still_candidates: 4,
            ..ConverterConfig::default()
        };
        let settings = ConvertSettings::from(&config);
        assert_eq!(settings.max_concurrent_jobs, 3);
        assert!(!settings.include_audio);
        assert_eq!(settings.still_candidates, 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ConverterConfig {
            max_concurrent_jobs: 0,
            ..ConverterConfig::default()
        };
        assert!(matches!(
            DefaultAppContainer::new(&config),
            Err(DomainError::InvalidInput(_))
        ));
    }
}
