// Convert interactor - Orchestrates the video to live-pair conversion use case

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::usecases::*;
use crate::engine::progress::{BatchProgress, Milestone};
use crate::engine::still::KeyFrameExtractor;
use crate::engine::ClipExporter;
use crate::output::{scratch_in, PersistenceOrchestrator, StoreGate};
use crate::pairing::PairingEngine;
use crate::planner::SegmentSelector;
use crate::ports::*;
use crate::probe::VideoProber;

/// Per-batch knobs taken from the converter configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertSettings {
    pub max_concurrent_jobs: usize,
    pub include_audio: bool,
    pub still_candidates: usize,
    /// Parent of per-job scratch directories; system temp when unset
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 1,
            include_audio: true,
            still_candidates: 1,
            scratch_dir: None,
        }
    }
}

/// Side that requests cancellation of a running batch
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Side observed by jobs between phases
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    pub fn new() -> (Self, CancelToken) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelToken { receiver })
    }

    /// Ask every job to stop at its next phase boundary
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl CancelToken {
    /// Token that is never cancelled
    pub fn never() -> Self {
        CancelHandle::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Everything a single job needs, shared by the tasks of a batch
struct JobPipeline {
    prober: VideoProber,
    selector: SegmentSelector,
    extractor: KeyFrameExtractor,
    exporter: ClipExporter,
    pairing: PairingEngine,
    persistence: PersistenceOrchestrator,
    log: Arc<dyn LogPort>,
    settings: ConvertSettings,
}

/// Job context handed to each task
struct JobContext {
    index: usize,
    source: SourceVideo,
    profile: QualityProfile,
    progress: Arc<BatchProgress>,
    cancel: CancelToken,
}

/// Interactor for the conversion use case
pub struct ConvertInteractor {
    pipeline: Arc<JobPipeline>,
    store: Arc<dyn AssetStorePort>,
    log: Arc<dyn LogPort>,
}

impl ConvertInteractor {
    /// Create new convert interactor with injected ports
    pub fn new(
        media: Arc<dyn MediaPort>,
        store: Arc<dyn AssetStorePort>,
        log: Arc<dyn LogPort>,
        settings: ConvertSettings,
    ) -> Self {
        let gate: StoreGate = Arc::default();
        let pipeline = JobPipeline {
            prober: VideoProber::new(Arc::clone(&media), Arc::clone(&log)),
            selector: SegmentSelector::new(Arc::clone(&media), Arc::clone(&log)),
            extractor: KeyFrameExtractor::new(
                Arc::clone(&media),
                Arc::clone(&log),
                settings.still_candidates,
            ),
            exporter: ClipExporter::new(Arc::clone(&media), Arc::clone(&log)),
            pairing: PairingEngine::new(),
            persistence: PersistenceOrchestrator::new(
                Arc::clone(&store),
                Arc::clone(&media),
                Arc::clone(&log),
                gate,
                settings.scratch_dir.clone(),
            ),
            log: Arc::clone(&log),
            settings,
        };
        Self {
            pipeline: Arc::new(pipeline),
            store,
            log,
        }
    }

    /// Convert every source of `request`.
    ///
    /// Jobs run concurrently up to the configured bound and each reaches its
    /// own terminal state; the report lists them in input order. Store
    /// permission is checked once, and a denial fails every job before any
    /// export starts.
    pub async fn execute(
        &self,
        request: ConvertRequest,
        progress: Arc<dyn ProgressSink>,
        cancel: CancelToken,
    ) -> BatchReport {
        let job_count = request.sources.len();
        let progress = Arc::new(BatchProgress::new(progress, job_count));
        self.log
            .info(&format!(
                "Converting {} video(s) with the {} profile",
                job_count, request.profile
            ))
            .await;

        if let Authorization::Denied(reason) = self.store.authorization().await {
            self.log
                .error(&format!("Asset store access denied: {}", reason))
                .await;
            let jobs = request
                .sources
                .into_iter()
                .enumerate()
                .map(|(index, source)| {
                    progress.report(index, Milestone::Finished);
                    JobOutcome {
                        index,
                        source,
                        result: Err(JobFailure::new(
                            DomainError::PermissionDenied(reason.clone()),
                            None,
                        )),
                    }
                })
                .collect();
            return BatchReport { jobs };
        }

        let limit = Arc::new(Semaphore::new(
            self.pipeline.settings.max_concurrent_jobs.max(1),
        ));
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<JobOutcome>> = vec![None; job_count];
        let sources = request.sources.clone();

        for (index, source) in request.sources.into_iter().enumerate() {
            let pipeline = Arc::clone(&self.pipeline);
            let limit = Arc::clone(&limit);
            let context = JobContext {
                index,
                source,
                profile: request.profile,
                progress: Arc::clone(&progress),
                cancel: cancel.clone(),
            };
            tasks.spawn(async move {
                // The semaphore is never closed
                let _permit = limit.acquire_owned().await.ok();
                pipeline.run(context).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    let index = outcome.index;
                    slots[index] = Some(outcome);
                }
                Err(e) => {
                    self.log
                        .error(&format!("Conversion task ended abnormally: {}", e))
                        .await
                }
            }
        }

        let jobs = slots
            .into_iter()
            .zip(sources)
            .enumerate()
            .map(|(index, (slot, source))| {
                slot.unwrap_or_else(|| {
                    progress.report(index, Milestone::Finished);
                    JobOutcome {
                        index,
                        source,
                        result: Err(JobFailure::new(
                            DomainError::Unknown("Conversion task ended abnormally".to_string()),
                            None,
                        )),
                    }
                })
            })
            .collect();
        BatchReport { jobs }
    }
}

impl JobPipeline {
    async fn run(&self, context: JobContext) -> JobOutcome {
        let index = context.index;
        context.progress.report(index, Milestone::Started);
        let result = self.convert(&context).await;
        context.progress.report(index, Milestone::Finished);

        let state = match &result {
            Ok(success) => JobState::Completed(success.asset_id.clone()),
            Err(failure) if failure.error.kind() == ErrorKind::Cancelled => JobState::Cancelled,
            Err(failure) => JobState::Failed(failure.error.clone()),
        };
        self.enter(&context, &state).await;
        if let Err(failure) = &result {
            self.log
                .error(&format!(
                    "{}: {}: {}",
                    context.source.display_name(),
                    failure.report.title,
                    failure.error
                ))
                .await;
        }

        JobOutcome {
            index,
            source: context.source,
            result,
        }
    }

    async fn convert(&self, context: &JobContext) -> Result<JobSuccess, JobFailure> {
        let source = &context.source;
        let progress = &context.progress;
        let index = context.index;

        self.checkpoint(context, JobState::Probing).await?;
        let outcome = self.prober.probe(source).await?;
        let probe = outcome.probe;
        let warnings: Vec<Diagnostic> = outcome.warnings.iter().map(Diagnostic::from_error).collect();
        progress.report(index, Milestone::Probed);

        self.checkpoint(context, JobState::SelectingSegment).await?;
        let selection = self
            .selector
            .select(source, &probe, context.profile.max_duration_seconds())
            .await?;
        let range = selection.range;
        progress.report(index, Milestone::SegmentSelected);

        self.checkpoint(context, JobState::ExtractingFrame).await?;
        let scratch = self.scratch_dir().map_err(|e| {
            JobFailure::new(
                DomainError::CreationFailed(format!("Cannot create scratch directory: {}", e)),
                Some(e.to_string()),
            )
        })?;
        let raw_still = self
            .extractor
            .extract(source, &range, scratch.path())
            .await?;

        let content_id = self.pairing.mint_identifier();
        let still_image_time = StillImageTime::ZERO;
        let image_path = scratch.path().join("IMG.JPG");
        self.pairing
            .tag_still(&raw_still, &image_path, &content_id, still_image_time)
            .await
            .map_err(|e| JobFailure::lifted(Phase::ExtractingFrame, &e))?;
        progress.report(index, Milestone::StillExtracted);

        self.checkpoint(context, JobState::Exporting).await?;
        let clip_path = scratch.path().join("IMG.MOV");
        let plan = self
            .exporter
            .plan(
                source,
                &probe,
                &range,
                context.profile,
                self.settings.include_audio,
                self.pairing.clip_tags(&content_id, still_image_time),
                &clip_path,
            )
            .await?;
        self.exporter.export(&plan).await?;
        progress.report(index, Milestone::ClipExported);

        self.checkpoint(context, JobState::Persisting).await?;
        let pair = MediaPair {
            image_path,
            clip_path,
            content_id: content_id.clone(),
            still_image_time,
        };
        let stored = self.persistence.persist(&pair).await?;
        progress.report(index, Milestone::Persisted);

        Ok(JobSuccess {
            asset_id: stored.asset.id,
            content_id,
            range,
            tier: stored.tier,
            linkage: stored.linkage,
            warnings,
        })
    }

    /// Enter `next` unless the batch was cancelled
    async fn checkpoint(&self, context: &JobContext, next: JobState) -> Result<(), JobFailure> {
        if context.cancel.is_cancelled() {
            return Err(JobFailure::new(
                DomainError::Cancelled(format!(
                    "{} cancelled before {}",
                    context.source.display_name(),
                    next.name()
                )),
                None,
            ));
        }
        self.enter(context, &next).await;
        Ok(())
    }

    async fn enter(&self, context: &JobContext, state: &JobState) {
        self.log
            .debug(&format!(
                "Job {} ({}) -> {}",
                context.index,
                context.source.display_name(),
                state.name()
            ))
            .await;
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("livepair-job-");
        scratch_in(&builder, self.settings.scratch_dir.as_deref())
    }
}
