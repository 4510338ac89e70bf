//! Batch progress tracking at coarse job milestones

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::ports::{ProgressSink, ProgressUpdate};

/// Points in a job at which progress is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Milestone {
    Started,
    Probed,
    SegmentSelected,
    StillExtracted,
    ClipExported,
    Persisted,
    /// Terminal state reached, whatever the outcome
    Finished,
}

impl Milestone {
    /// Share of a job done at this milestone
    pub fn fraction(&self) -> f64 {
        match self {
            Milestone::Started => 0.0,
            Milestone::Probed => 0.1,
            Milestone::SegmentSelected => 0.25,
            Milestone::StillExtracted => 0.4,
            Milestone::ClipExported => 0.75,
            Milestone::Persisted => 0.95,
            Milestone::Finished => 1.0,
        }
    }
}

/// Aggregates per-job milestones into an overall fraction
pub struct BatchProgress {
    sink: Arc<dyn ProgressSink>,
    jobs: Mutex<Vec<f64>>,
}

impl BatchProgress {
    pub fn new(sink: Arc<dyn ProgressSink>, job_count: usize) -> Self {
        Self {
            sink,
            jobs: Mutex::new(vec![0.0; job_count]),
        }
    }

    /// Record a milestone and forward the overall fraction. Per-job progress
    /// never moves backwards, and the sink sees overall fractions in order
    /// because forwarding happens under the same lock.
    pub fn report(&self, job_index: usize, milestone: Milestone) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let Some(slot) = jobs.get_mut(job_index) else {
            return;
        };
        *slot = slot.max(milestone.fraction());
        let fraction = jobs.iter().sum::<f64>() / jobs.len() as f64;
        self.sink.report(ProgressUpdate {
            fraction: fraction.clamp(0.0, 1.0),
            job_index,
        });
    }
}
