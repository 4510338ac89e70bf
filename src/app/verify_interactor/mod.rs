// Verify interactor - Checks the linkage of a finished pair

use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::DomainError;
use crate::domain::usecases::PairVerification;
use crate::output::verifier::PairVerifier;
use crate::ports::LogPort;

/// Interactor for the pair verification use case
pub struct VerifyInteractor {
    verifier: PairVerifier,
    log_port: Arc<dyn LogPort>,
}

impl VerifyInteractor {
    pub fn new(log_port: Arc<dyn LogPort>) -> Self {
        Self {
            verifier: PairVerifier::new(),
            log_port,
        }
    }

    /// Read both halves of a pair and report whether they are linked
    pub async fn execute(&self, image: &Path, clip: &Path) -> Result<PairVerification, DomainError> {
        let result = self.verifier.verify(image, clip).await;
        if let Err(e) = &result {
            self.log_port
                .error(&format!("Verification failed: {}", e))
                .await;
        }
        result
    }
}
