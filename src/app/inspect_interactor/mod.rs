// Inspect interactor - Probe plus quick compatibility check

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::model::*;
use crate::domain::usecases::CompatibilityReport;
use crate::ports::*;
use crate::probe::validator::MediaValidator;
use crate::probe::VideoProber;

/// Interactor for the inspection use case
pub struct InspectInteractor {
    prober: VideoProber,
    log_port: Arc<dyn LogPort>,
}

impl InspectInteractor {
    /// Create new inspect interactor with injected ports
    pub fn new(media_port: Arc<dyn MediaPort>, log_port: Arc<dyn LogPort>) -> Self {
        Self {
            prober: VideoProber::new(media_port, Arc::clone(&log_port)),
            log_port,
        }
    }

    /// Probe `input` and report every finding. Probe failures are part of
    /// the report rather than an error.
    pub async fn execute(&self, input: PathBuf) -> CompatibilityReport {
        let source = SourceVideo::new(input);
        self.log_port
            .info(&format!("Inspecting {}", source.path().display()))
            .await;

        let report = MediaValidator::new(&self.prober).check(&source).await;
        if report.is_compatible() {
            self.log_port
                .info(&format!("{} can be converted", source.display_name()))
                .await;
        } else {
            self.log_port
                .warn(&format!("{} cannot be converted", source.display_name()))
                .await;
        }
        report
    }
}
