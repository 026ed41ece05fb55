// ==============================================================================
// store/mod.rs - Run Store
// ==============================================================================
// Description: Keyed persistence for analysis runs
// Author: Matt Barham
// Created: 2026-09-22
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::run::{AnalysisRun, RunUpdate, TransitionError};

pub mod memory;
pub mod postgres;
pub mod redis;

pub use self::memory::MemoryRunStore;
pub use self::postgres::PostgresRunStore;
pub use self::redis::RedisRunStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("A run already exists for report {0}")]
    AlreadyExists(String),

    #[error("No run found for report {0}")]
    NotFound(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to serialize run record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Run persistence keyed by report id
///
/// `create` refuses any existing record for the report, terminal or not, so a
/// finished run is never overwritten. `update` is applied
/// through [`AnalysisRun::apply`], so every backend enforces the same status
/// machine.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn create(&self, run: AnalysisRun) -> Result<(), StoreError>;

    async fn update(&self, report_id: &str, update: RunUpdate) -> Result<AnalysisRun, StoreError>;

    async fn get(&self, report_id: &str) -> Result<Option<AnalysisRun>, StoreError>;

    /// Runs currently in Processing (stuck-run recovery)
    async fn list_processing(&self) -> Result<Vec<AnalysisRun>, StoreError>;
}
