// Domain use cases - Request and outcome types shared by the interactors

use std::path::PathBuf;

use serde::Serialize;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::MediaError;

/// Request to convert a batch of videos
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub sources: Vec<SourceVideo>,
    pub profile: QualityProfile,
}

impl ConvertRequest {
    pub fn new(sources: Vec<SourceVideo>, profile: QualityProfile) -> Result<Self, DomainError> {
        if sources.is_empty() {
            return Err(DomainError::InvalidInput(
                "At least one input video is required".to_string(),
            ));
        }
        Ok(Self { sources, profile })
    }
}

/// A non-fatal finding attached to a job or compatibility check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(error: &DomainError) -> Self {
        let report = ErrorClassifier::report(error);
        Self {
            kind: report.kind,
            severity: report.severity,
            title: report.title,
            message: report.message,
        }
    }
}

/// Classified terminal failure of a job
#[derive(Debug, Clone, PartialEq)]
pub struct JobFailure {
    pub error: DomainError,
    pub report: ErrorReport,
    /// Low-level error text, kept for diagnostics
    pub raw: Option<String>,
}

impl JobFailure {
    pub fn new(error: DomainError, raw: Option<String>) -> Self {
        let report = ErrorClassifier::report(&error);
        Self { error, report, raw }
    }

    /// Classify a low-level failure from `phase`, keeping its debug form
    /// (tool stderr and exit code included) as the raw text
    pub fn lifted(phase: Phase, error: &MediaError) -> Self {
        Self::new(ErrorClassifier::lift(phase, error), Some(format!("{:?}", error)))
    }
}

impl From<DomainError> for JobFailure {
    fn from(error: DomainError) -> Self {
        Self::new(error, None)
    }
}

/// Successful job result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSuccess {
    pub asset_id: String,
    pub content_id: ContentIdentifier,
    pub range: TimeRange,
    pub tier: PersistTier,
    pub linkage: Linkage,
    pub warnings: Vec<Diagnostic>,
}

/// Terminal result of one job in a batch
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub index: usize,
    pub source: SourceVideo,
    pub result: Result<JobSuccess, JobFailure>,
}

/// Results of every job of a batch, ordered by job index
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobOutcome>,
}

impl BatchReport {
    /// Asset ids of the successful jobs
    pub fn asset_ids(&self) -> Vec<String> {
        self.jobs
            .iter()
            .filter_map(|job| job.result.as_ref().ok().map(|s| s.asset_id.clone()))
            .collect()
    }

    /// First failure by job index, if any
    pub fn first_failure(&self) -> Option<&JobOutcome> {
        self.jobs.iter().find(|job| job.result.is_err())
    }

    /// Completion contract: every asset id, or the first hard failure
    pub fn into_result(self) -> Result<Vec<String>, JobFailure> {
        let mut ids = Vec::with_capacity(self.jobs.len());
        for job in self.jobs {
            ids.push(job.result?.asset_id);
        }
        Ok(ids)
    }
}

/// Output of the quick compatibility check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub source: PathBuf,
    pub probe: Option<ProbeResult>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompatibilityReport {
    /// Usable unless a diagnostic is an error or worse
    pub fn is_compatible(&self) -> bool {
        self.diagnostics
            .iter()
            .all(|d| d.severity < Severity::Error)
    }
}

/// Linkage found in a finished still/clip pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairVerification {
    pub image_content_id: Option<String>,
    pub clip_content_id: Option<String>,
    pub image_still_time: Option<f64>,
    pub clip_still_time: Option<String>,
    pub live_photo_flag: bool,
}

impl PairVerification {
    /// Both halves carry the same non-empty identifier
    pub fn is_linked(&self) -> bool {
        match (&self.image_content_id, &self.clip_content_id) {
            (Some(image), Some(clip)) => !image.is_empty() && image.as_bytes() == clip.as_bytes(),
            _ => false,
        }
    }
}
