// ==============================================================================
// orchestrator.rs - Analysis Pipeline Orchestrator
// ==============================================================================
// Description: Per-report background runs: decode, extract, progress, insights
// Author: Matt Barham
// Created: 2026-09-27
// Modified: 2026-10-16
// Version: 1.3.0
// ==============================================================================

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use marker_processor::decoder::{DecodeError, Decoder};
use marker_processor::validator::{UploadError, UploadValidator, MAX_UPLOAD_SIZE};
use marker_processor::{extract_health_markers, DnaProvider, FormatError};

use crate::insights::{InsightBundle, InsightGenerator};
use crate::progress::{ProgressError, ProgressSchedule};
use crate::run::{
    AnalysisRun, RunOutcome, RunUpdate, StatusView, SubjectProfile, EMPTY_RESULT_WARNING,
    PLACEHOLDER_TOTAL_MARKERS,
};
use crate::store::{RunStore, StoreError};

pub const STUCK_RUN_MESSAGE: &str = "Analysis interrupted by worker restart. Please resubmit your data.";

/// One uploaded export awaiting analysis
#[derive(Debug, Clone)]
pub struct Submission {
    pub report_id: String,
    pub encoded_content: Vec<u8>,
    pub filename: String,
    pub provider: DnaProvider,
    pub profile: SubjectProfile,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Analysis already running for report {0}")]
    AlreadyRunning(String),

    #[error("A run already exists for report {0}; submit under a new report id")]
    ReportExists(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Analysis exceeded the {0:?} deadline")]
    DeadlineExceeded(Duration),

    #[error("Marker extraction task failed: {0}")]
    Task(#[from] JoinError),
}

impl From<ProgressError> for PipelineError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::Cancelled => PipelineError::Cancelled,
            ProgressError::Store(e) => PipelineError::Store(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub schedule: ProgressSchedule,
    /// Deadline for a whole run, measured from the start of processing
    pub run_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            schedule: ProgressSchedule::default(),
            run_timeout: None,
            max_upload_bytes: MAX_UPLOAD_SIZE,
        }
    }
}

/// Handle to a submitted run
#[derive(Debug)]
pub struct RunHandle {
    report_id: String,
    run_id: Uuid,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub fn report_id(&self) -> &str {
        &self.report_id
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Request cancellation; the run ends Failed
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the run has reached a terminal status
    pub async fn wait(self) -> Result<(), JoinError> {
        self.task.await
    }
}

struct Inner {
    store: Arc<dyn RunStore>,
    decoder: Arc<dyn Decoder>,
    insights: Arc<dyn InsightGenerator>,
    settings: OrchestratorSettings,
    /// Report id -> cancellation token of its active run
    active: Mutex<HashMap<String, CancellationToken>>,
}

/// Drives one background task per submitted report
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn RunStore>,
        decoder: Arc<dyn Decoder>,
        insights: Arc<dyn InsightGenerator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                decoder,
                insights,
                settings,
                active: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Record the run as Uploaded and start it in the background
    pub async fn submit(&self, submission: Submission) -> Result<RunHandle, PipelineError> {
        let cancel = CancellationToken::new();
        self.register(&submission.report_id, cancel.clone())?;

        let run = AnalysisRun::uploaded(&submission.report_id, &submission.filename, submission.provider);
        let run_id = run.id;
        if let Err(e) = self.inner.store.create(run).await {
            self.unregister(&submission.report_id);
            return Err(match e {
                StoreError::AlreadyExists(report_id) => PipelineError::ReportExists(report_id),
                other => other.into(),
            });
        }

        info!(
            "Accepted report {} (run {}, file {}, provider {})",
            submission.report_id, run_id, submission.filename, submission.provider
        );

        let report_id = submission.report_id.clone();
        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            orchestrator.drive(submission, token).await;
        });

        Ok(RunHandle {
            report_id,
            run_id,
            cancel,
            task,
        })
    }

    pub async fn get_status(&self, report_id: &str) -> Result<Option<StatusView>, PipelineError> {
        Ok(self
            .inner
            .store
            .get(report_id)
            .await?
            .map(|run| run.status_view()))
    }

    /// Cancel the active run for a report, if any
    pub fn cancel(&self, report_id: &str) -> bool {
        match self.active().get(report_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self, report_id: &str) -> bool {
        self.active().contains_key(report_id)
    }

    /// Fail runs left in Processing by a previous worker instance
    pub async fn recover_stuck_runs(&self, threshold: chrono::Duration) -> Result<usize, PipelineError> {
        let cutoff = Utc::now() - threshold;

        let stuck: Vec<AnalysisRun> = self
            .inner
            .store
            .list_processing()
            .await?
            .into_iter()
            .filter(|run| run.started_at.map_or(true, |started| started < cutoff))
            .filter(|run| !self.is_active(&run.report_id))
            .collect();

        if stuck.is_empty() {
            info!("No stuck runs found");
            return Ok(0);
        }

        info!("Found {} stuck run(s), marking as failed", stuck.len());

        for run in &stuck {
            warn!("Marking stuck run as failed: report {} (run {})", run.report_id, run.id);
            self.inner
                .store
                .update(
                    &run.report_id,
                    RunUpdate::Failed {
                        error_message: STUCK_RUN_MESSAGE.to_string(),
                    },
                )
                .await?;
        }

        Ok(stuck.len())
    }

    fn active(&self) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
        self.inner.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, report_id: &str, cancel: CancellationToken) -> Result<(), PipelineError> {
        let mut active = self.active();
        if active.contains_key(report_id) {
            return Err(PipelineError::AlreadyRunning(report_id.to_string()));
        }
        active.insert(report_id.to_string(), cancel);
        Ok(())
    }

    fn unregister(&self, report_id: &str) {
        self.active().remove(report_id);
    }

    async fn drive(&self, submission: Submission, cancel: CancellationToken) {
        let report_id = submission.report_id.clone();
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            result = self.run_with_deadline(submission, &cancel) => result,
        };

        match result {
            Ok(()) => info!("Report {} analyzed in {:?}", report_id, started.elapsed()),
            Err(e) => {
                error!("Report {} failed after {:?}: {}", report_id, started.elapsed(), e);
                let update = RunUpdate::Failed {
                    error_message: e.to_string(),
                };
                if let Err(store_err) = self.inner.store.update(&report_id, update).await {
                    error!("Failed to record failure for report {}: {}", report_id, store_err);
                }
            }
        }

        self.unregister(&report_id);
    }

    async fn run_with_deadline(
        &self,
        submission: Submission,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        match self.inner.settings.run_timeout {
            Some(limit) => tokio::time::timeout(limit, self.process(submission, cancel))
                .await
                .map_err(|_| PipelineError::DeadlineExceeded(limit))?,
            None => self.process(submission, cancel).await,
        }
    }

    async fn process(&self, submission: Submission, cancel: &CancellationToken) -> Result<(), PipelineError> {
        let Submission {
            report_id,
            encoded_content,
            filename,
            provider,
            profile,
        } = submission;
        let store = &self.inner.store;

        store
            .update(
                &report_id,
                RunUpdate::Started {
                    total_markers: PLACEHOLDER_TOTAL_MARKERS,
                },
            )
            .await?;
        info!("Report {}: processing {} ({} bytes encoded)", report_id, filename, encoded_content.len());

        // Step 1: Decode
        let payload = self.inner.decoder.decode(&encoded_content)?;
        drop(encoded_content);

        // Step 2: Validate
        let upload = UploadValidator::with_max_size(self.inner.settings.max_upload_bytes)
            .validate(&filename, payload.text.as_bytes())?;

        // Step 3: Detect, parse, filter
        let text = payload.text;
        let safe_name = upload.safe_name.clone();
        let extraction =
            tokio::task::spawn_blocking(move || extract_health_markers(&text, &safe_name, provider)).await??;

        let total_markers = extraction.raw_marker_count as u64;
        let warning = if extraction.is_empty() {
            warn!("Report {}: {}", report_id, EMPTY_RESULT_WARNING);
            Some(EMPTY_RESULT_WARNING.to_string())
        } else {
            None
        };

        // Step 4: Progress checkpoints
        let progress_store = store.clone();
        let progress_report = report_id.clone();
        self.inner
            .settings
            .schedule
            .emit(total_markers, cancel, move |markers_analyzed, total_markers| {
                let store = progress_store.clone();
                let report_id = progress_report.clone();
                async move {
                    store
                        .update(
                            &report_id,
                            RunUpdate::Progress {
                                markers_analyzed,
                                total_markers,
                            },
                        )
                        .await
                        .map(|_| ())
                }
            })
            .await?;

        // Step 5: Insights
        let insights = match self.inner.insights.generate(&extraction.markers, &profile).await {
            Ok(bundle) => bundle,
            Err(e) => {
                warn!("Insight generation failed for report {}, using fallback: {}", report_id, e);
                InsightBundle::fallback()
            }
        };

        // Step 6: Persist markers and final status together
        let outcome = RunOutcome {
            dialect: extraction.dialect,
            markers: extraction.markers,
            summary: extraction.summary,
            insights,
            total_markers,
            file_size: payload.file_size,
            sha256: upload.hash_sha256,
            warning,
        };
        store.update(&report_id, RunUpdate::Analyzed(Box::new(outcome))).await?;

        Ok(())
    }
}
