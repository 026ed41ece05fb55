// ==============================================================================
// store/memory.rs - In-Memory Run Store
// ==============================================================================
// Description: Process-local run store for tests and single-node use
// Author: Matt Barham
// Created: 2026-09-22
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::{RunStore, StoreError};
use crate::run::{AnalysisRun, RunStatus, RunUpdate};

#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<String, AnalysisRun>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, run: AnalysisRun) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        if runs.contains_key(&run.report_id) {
            return Err(StoreError::AlreadyExists(run.report_id));
        }
        runs.insert(run.report_id.clone(), run);
        Ok(())
    }

    async fn update(&self, report_id: &str, update: RunUpdate) -> Result<AnalysisRun, StoreError> {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(report_id)
            .ok_or_else(|| StoreError::NotFound(report_id.to_string()))?;

        // Apply to a copy so a rejected update leaves the record untouched
        let mut next = run.clone();
        next.apply(update)?;
        *run = next.clone();
        Ok(next)
    }

    async fn get(&self, report_id: &str) -> Result<Option<AnalysisRun>, StoreError> {
        Ok(self.runs.read().await.get(report_id).cloned())
    }

    async fn list_processing(&self) -> Result<Vec<AnalysisRun>, StoreError> {
        Ok(self
            .runs
            .read()
            .await
            .values()
            .filter(|run| run.status == RunStatus::Processing)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marker_processor::DnaProvider;

    #[tokio::test]
    async fn test_create_refuses_active_duplicate() {
        let store = MemoryRunStore::new();
        store
            .create(AnalysisRun::uploaded("r1", "a.txt", DnaProvider::Generic))
            .await
            .unwrap();

        let err = store
            .create(AnalysisRun::uploaded("r1", "b.txt", DnaProvider::Generic))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_create_keeps_terminal_run() {
        let store = MemoryRunStore::new();
        store
            .create(AnalysisRun::uploaded("r1", "a.txt", DnaProvider::Generic))
            .await
            .unwrap();
        store
            .update("r1", RunUpdate::Failed { error_message: "boom".into() })
            .await
            .unwrap();

        let err = store
            .create(AnalysisRun::uploaded("r1", "b.txt", DnaProvider::Generic))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref id) if id == "r1"));

        let run = store.get("r1").await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.filename, "a.txt");
        assert_eq!(run.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_rejected_update_leaves_record_untouched() {
        let store = MemoryRunStore::new();
        store
            .create(AnalysisRun::uploaded("r1", "a.txt", DnaProvider::Generic))
            .await
            .unwrap();
        store.update("r1", RunUpdate::Started { total_markers: 900 }).await.unwrap();

        assert!(store
            .update("r1", RunUpdate::Started { total_markers: 900 })
            .await
            .is_err());
        assert!(matches!(
            store.update("missing", RunUpdate::Started { total_markers: 1 }).await,
            Err(StoreError::NotFound(_))
        ));

        let processing = store.list_processing().await.unwrap();
        assert_eq!(processing.len(), 1);
        assert_eq!(processing[0].total_markers, 900);
    }
}
