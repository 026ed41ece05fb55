// ==============================================================================
// store/postgres.rs - PostgreSQL Run Store
// ==============================================================================
// Description: JSONB run records in PostgreSQL
// Author: Matt Barham
// Created: 2026-09-23
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;

use super::{RunStore, StoreError};
use crate::run::{AnalysisRun, RunStatus, RunUpdate};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS marker_runs (
    report_id TEXT PRIMARY KEY,
    status TEXT NOT NULL,
    record JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
)";

/// One row per report; the full run lives in `record`, `status` is
/// denormalized for the stuck-run query
#[derive(Clone)]
pub struct PostgresRunStore {
    pool: PgPool,
}

impl PostgresRunStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        info!("marker_runs table ready");
        Ok(())
    }
}

#[async_trait]
impl RunStore for PostgresRunStore {
    async fn create(&self, run: AnalysisRun) -> Result<(), StoreError> {
        // Any existing row, finished or not, makes the insert a no-op
        let result = sqlx::query(
            "INSERT INTO marker_runs (report_id, status, record, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (report_id) DO NOTHING",
        )
        .bind(&run.report_id)
        .bind(run.status.as_str())
        .bind(Json(&run))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(run.report_id));
        }
        Ok(())
    }

    async fn update(&self, report_id: &str, update: RunUpdate) -> Result<AnalysisRun, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(Json<AnalysisRun>,)> =
            sqlx::query_as("SELECT record FROM marker_runs WHERE report_id = $1 FOR UPDATE")
                .bind(report_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((Json(mut run),)) = row else {
            return Err(StoreError::NotFound(report_id.to_string()));
        };

        run.apply(update)?;

        sqlx::query("UPDATE marker_runs SET status = $1, record = $2, updated_at = $3 WHERE report_id = $4")
            .bind(run.status.as_str())
            .bind(Json(&run))
            .bind(Utc::now())
            .bind(report_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(run)
    }

    async fn get(&self, report_id: &str) -> Result<Option<AnalysisRun>, StoreError> {
        let row: Option<(Json<AnalysisRun>,)> =
            sqlx::query_as("SELECT record FROM marker_runs WHERE report_id = $1")
                .bind(report_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(run),)| run))
    }

    async fn list_processing(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        let rows: Vec<(Json<AnalysisRun>,)> =
            sqlx::query_as("SELECT record FROM marker_runs WHERE status = $1")
                .bind(RunStatus::Processing.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(Json(run),)| run).collect())
    }
}
