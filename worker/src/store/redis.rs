// ==============================================================================
// store/redis.rs - Redis Run Store
// ==============================================================================
// Description: JSON run records in Redis with progress pub/sub
// Author: Matt Barham
// Created: 2026-09-23
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use super::{RunStore, StoreError};
use crate::queue::progress_channel;
use crate::run::{AnalysisRun, RunStatus, RunUpdate};

const RUN_KEY_PREFIX: &str = "markers:run:";
const RUN_INDEX_KEY: &str = "markers:runs";

fn run_key(report_id: &str) -> String {
    format!("{}{}", RUN_KEY_PREFIX, report_id)
}

/// Run records stored as JSON strings, one key per report
///
/// Every accepted update is also published on the report's progress channel.
#[derive(Clone)]
pub struct RedisRunStore {
    conn: ConnectionManager,
}

impl RedisRunStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    async fn load(&self, report_id: &str) -> Result<Option<AnalysisRun>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(run_key(report_id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, run: &AnalysisRun) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(run)?;
        conn.set::<_, _, ()>(run_key(&run.report_id), json).await?;
        Ok(())
    }

    async fn publish_progress(&self, run: &AnalysisRun) {
        let mut conn = self.conn.clone();
        let view = run.status_view();
        let message = serde_json::json!({
            "report_id": view.report_id,
            "status": view.status,
            "markers_analyzed": view.markers_analyzed,
            "total_markers": view.total_markers,
            "progress_pct": view.progress_percent,
            "message": view.error_message.or(view.warning),
            "timestamp": Utc::now().to_rfc3339(),
        });

        // Subscribers are optional; polling the record stays authoritative
        if let Err(e) = conn
            .publish::<_, _, ()>(progress_channel(&run.report_id), message.to_string())
            .await
        {
            warn!("Failed to publish progress for report {}: {}", run.report_id, e);
        }
    }
}

#[async_trait]
impl RunStore for RedisRunStore {
    async fn create(&self, run: AnalysisRun) -> Result<(), StoreError> {
        // SETNX so two workers racing on one report cannot both win
        let mut conn = self.conn.clone();
        let json = serde_json::to_string(&run)?;
        let created: bool = conn.set_nx(run_key(&run.report_id), json).await?;
        if !created {
            return Err(StoreError::AlreadyExists(run.report_id));
        }

        conn.sadd::<_, _, ()>(RUN_INDEX_KEY, &run.report_id).await?;
        self.publish_progress(&run).await;
        Ok(())
    }

    async fn update(&self, report_id: &str, update: RunUpdate) -> Result<AnalysisRun, StoreError> {
        let mut run = self
            .load(report_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(report_id.to_string()))?;

        run.apply(update)?;
        self.save(&run).await?;
        self.publish_progress(&run).await;
        Ok(run)
    }

    async fn get(&self, report_id: &str) -> Result<Option<AnalysisRun>, StoreError> {
        self.load(report_id).await
    }

    async fn list_processing(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        let mut conn = self.conn.clone();
        let report_ids: Vec<String> = conn.smembers(RUN_INDEX_KEY).await?;

        let mut processing = Vec::new();
        for report_id in report_ids {
            if let Some(run) = self.load(&report_id).await? {
                if run.status == RunStatus::Processing {
                    processing.push(run);
                }
            }
        }
        Ok(processing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_key() {
        assert_eq!(run_key("abc"), "markers:run:abc");
    }
}
