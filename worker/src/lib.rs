// ==============================================================================
// lib.rs - Analysis Worker Library
// ==============================================================================
// Description: Background analysis pipeline for uploaded genome exports
// Author: Matt Barham
// Created: 2026-09-21
// Modified: 2026-10-06
// Version: 1.0.0
// ==============================================================================

pub mod config;
pub mod insights;
pub mod orchestrator;
pub mod progress;
pub mod queue;
pub mod run;
pub mod store;

pub use config::WorkerConfig;
pub use orchestrator::{Orchestrator, OrchestratorSettings, PipelineError, RunHandle, Submission};
pub use run::{AnalysisRun, RunStatus, StatusView, SubjectProfile};
pub use store::{RunStore, StoreError};
