// ==============================================================================
// run.rs - Analysis Run Record
// ==============================================================================
// Description: Per-report run record, status machine and polling view
// Author: Matt Barham
// Created: 2026-09-21
// Modified: 2026-10-16
// Version: 1.2.0
// ==============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use marker_processor::{Dialect, DnaProvider, GeneticMarker, GeneticSummary};

use crate::insights::InsightBundle;

/// Total asserted on entering Processing, before the real count is known
pub const PLACEHOLDER_TOTAL_MARKERS: u64 = 900;

/// Warning recorded when a recognized export yields no catalog hits
pub const EMPTY_RESULT_WARNING: &str = "No health-relevant markers found in the uploaded file";

/// Run lifecycle status
///
/// Uploaded -> Processing -> {Analyzed | Failed}. A run cancelled before it
/// starts goes from Uploaded straight to Failed. Analyzed and Failed are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Uploaded,
    Processing,
    Analyzed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Uploaded => "uploaded",
            RunStatus::Processing => "processing",
            RunStatus::Analyzed => "analyzed",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Analyzed | RunStatus::Failed)
    }

    /// Uploaded -> Processing -> {Analyzed | Failed}; Uploaded may also fail
    /// directly when a run is cancelled before it starts.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Uploaded, RunStatus::Processing)
                | (RunStatus::Uploaded, RunStatus::Failed)
                | (RunStatus::Processing, RunStatus::Processing)
                | (RunStatus::Processing, RunStatus::Analyzed)
                | (RunStatus::Processing, RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(RunStatus::Uploaded),
            "processing" => Ok(RunStatus::Processing),
            "analyzed" => Ok(RunStatus::Analyzed),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("Unknown run status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// Demographics forwarded to the insight generator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub age: Option<u32>,
    pub sex: Option<Sex>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}

/// Everything persisted together with the Analyzed status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub dialect: Dialect,
    pub markers: Vec<GeneticMarker>,
    pub summary: GeneticSummary,
    pub insights: InsightBundle,
    pub total_markers: u64,
    pub file_size: usize,
    pub sha256: String,
    pub warning: Option<String>,
}

/// Point update applied to a stored run
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Started { total_markers: u64 },
    Progress { markers_analyzed: u64, total_markers: u64 },
    Analyzed(Box<RunOutcome>),
    Failed { error_message: String },
}

impl RunUpdate {
    fn target_status(&self) -> RunStatus {
        match self {
            RunUpdate::Started { .. } | RunUpdate::Progress { .. } => RunStatus::Processing,
            RunUpdate::Analyzed(_) => RunStatus::Analyzed,
            RunUpdate::Failed { .. } => RunStatus::Failed,
        }
    }
}

/// Rejected run update
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Run for report {report_id} cannot move from {from} to {to}")]
    Illegal {
        report_id: String,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("Run for report {report_id} progress would regress from {current} to {requested}")]
    Regression {
        report_id: String,
        current: u64,
        requested: u64,
    },

    #[error("Run for report {report_id} reports {analyzed} analyzed of {total}")]
    Overflow {
        report_id: String,
        analyzed: u64,
        total: u64,
    },
}

/// One analysis attempt for one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub report_id: String,
    pub status: RunStatus,
    pub markers_analyzed: u64,
    pub total_markers: u64,
    pub error_message: Option<String>,
    pub warning: Option<String>,
    pub filename: String,
    pub provider: DnaProvider,
    pub dialect: Option<Dialect>,
    /// Written only together with the Analyzed status
    #[serde(default)]
    pub markers: Vec<GeneticMarker>,
    pub summary: Option<GeneticSummary>,
    pub insights: Option<InsightBundle>,
    pub file_size: Option<usize>,
    pub sha256: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AnalysisRun {
    pub fn uploaded(report_id: impl Into<String>, filename: impl Into<String>, provider: DnaProvider) -> Self {
        Self {
            id: Uuid::new_v4(),
            report_id: report_id.into(),
            status: RunStatus::Uploaded,
            markers_analyzed: 0,
            total_markers: 0,
            error_message: None,
            warning: None,
            filename: filename.into(),
            provider,
            dialect: None,
            markers: Vec::new(),
            summary: None,
            insights: None,
            file_size: None,
            sha256: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Apply a point update, enforcing monotone status and progress
    pub fn apply(&mut self, update: RunUpdate) -> Result<(), TransitionError> {
        let next = update.target_status();
        let legal = match update {
            RunUpdate::Started { .. } => self.status == RunStatus::Uploaded,
            RunUpdate::Progress { .. } => self.status == RunStatus::Processing,
            _ => self.status.can_transition_to(next),
        };
        if !legal {
            return Err(TransitionError::Illegal {
                report_id: self.report_id.clone(),
                from: self.status,
                to: next,
            });
        }

        let now = Utc::now();
        match update {
            RunUpdate::Started { total_markers } => {
                self.status = RunStatus::Processing;
                self.markers_analyzed = 0;
                self.total_markers = total_markers;
                self.started_at = Some(now);
            }
            RunUpdate::Progress {
                markers_analyzed,
                total_markers,
            } => {
                if markers_analyzed > total_markers {
                    return Err(TransitionError::Overflow {
                        report_id: self.report_id.clone(),
                        analyzed: markers_analyzed,
                        total: total_markers,
                    });
                }
                if markers_analyzed < self.markers_analyzed {
                    return Err(TransitionError::Regression {
                        report_id: self.report_id.clone(),
                        current: self.markers_analyzed,
                        requested: markers_analyzed,
                    });
                }
                self.markers_analyzed = markers_analyzed;
                self.total_markers = total_markers;
            }
            RunUpdate::Analyzed(outcome) => {
                let outcome = *outcome;
                self.status = RunStatus::Analyzed;
                self.markers_analyzed = outcome.total_markers;
                self.total_markers = outcome.total_markers;
                self.dialect = Some(outcome.dialect);
                self.markers = outcome.markers;
                self.summary = Some(outcome.summary);
                self.insights = Some(outcome.insights);
                self.file_size = Some(outcome.file_size);
                self.sha256 = Some(outcome.sha256);
                self.warning = outcome.warning;
                self.completed_at = Some(now);
            }
            RunUpdate::Failed { error_message } => {
                // Counters keep their last values
                self.status = RunStatus::Failed;
                self.error_message = Some(error_message);
                self.completed_at = Some(now);
            }
        }

        Ok(())
    }

    pub fn status_view(&self) -> StatusView {
        StatusView::from(self)
    }
}

/// Polling view of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusView {
    pub report_id: String,
    pub status: RunStatus,
    pub markers_analyzed: u64,
    pub total_markers: u64,
    pub progress_percent: f64,
    pub error_message: Option<String>,
    pub warning: Option<String>,
}

impl From<&AnalysisRun> for StatusView {
    fn from(run: &AnalysisRun) -> Self {
        Self {
            report_id: run.report_id.clone(),
            status: run.status,
            markers_analyzed: run.markers_analyzed,
            total_markers: run.total_markers,
            progress_percent: progress_percent(run.markers_analyzed, run.total_markers),
            error_message: run.error_message.clone(),
            warning: run.warning.clone(),
        }
    }
}

pub fn progress_percent(markers_analyzed: u64, total_markers: u64) -> f64 {
    100.0 * markers_analyzed as f64 / total_markers.max(1) as f64
}
