//! Quick compatibility check used before a conversion

use crate::domain::model::SourceVideo;
use crate::domain::usecases::{CompatibilityReport, Diagnostic};
use crate::probe::VideoProber;

/// Media file validator
pub struct MediaValidator<'a> {
    prober: &'a VideoProber,
}

impl<'a> MediaValidator<'a> {
    pub fn new(prober: &'a VideoProber) -> Self {
        Self { prober }
    }

    /// Probe `source` and collect every finding as a diagnostic. Never fails:
    /// a probe error becomes an error-severity diagnostic.
    pub async fn check(&self, source: &SourceVideo) -> CompatibilityReport {
        match self.prober.probe(source).await {
            Ok(outcome) => CompatibilityReport {
                source: source.path().to_path_buf(),
                diagnostics: outcome.warnings.iter().map(Diagnostic::from_error).collect(),
                probe: Some(outcome.probe),
            },
            Err(failure) => CompatibilityReport {
                source: source.path().to_path_buf(),
                probe: None,
                diagnostics: vec![Diagnostic::from_error(&failure.error)],
            },
        }
    }
}
