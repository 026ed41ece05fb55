// ==============================================================================
// progress.rs - Progress Emitter
// ==============================================================================
// Description: Paced, monotone "markers analyzed" checkpoints
// Author: Matt Barham
// Created: 2026-09-25
// Modified: 2026-10-03
// Version: 1.0.0
// ==============================================================================

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::store::StoreError;

/// Checkpoints as per-mille of the run total
pub const CHECKPOINTS_PER_MILLE: [u64; 6] = [111, 278, 500, 722, 941, 1000];

pub const DEFAULT_PACING: Duration = Duration::from_millis(1500);

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Progress emission cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fixed checkpoint schedule with a swappable pacing delay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressSchedule {
    pacing: Duration,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_PACING)
    }
}

impl ProgressSchedule {
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    /// No pacing between checkpoints
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    /// Non-decreasing analyzed counts ending at `total`
    pub fn checkpoints_for(&self, total: u64) -> Vec<u64> {
        CHECKPOINTS_PER_MILLE
            .iter()
            .map(|per_mille| total * per_mille / 1000)
            .collect()
    }

    /// Drive `on_checkpoint(analyzed, total)` through the schedule
    ///
    /// Each callback completes before the next delay starts. Cancellation
    /// interrupts the delay and stops emission.
    pub async fn emit<F, Fut>(
        &self,
        total: u64,
        cancel: &CancellationToken,
        mut on_checkpoint: F,
    ) -> Result<(), ProgressError>
    where
        F: FnMut(u64, u64) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        for analyzed in self.checkpoints_for(total) {
            if !self.pacing.is_zero() {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ProgressError::Cancelled),
                    _ = tokio::time::sleep(self.pacing) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(ProgressError::Cancelled);
            }

            on_checkpoint(analyzed, total).await?;
            debug!("Progress checkpoint {}/{}", analyzed, total);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_checkpoints_match_legacy_schedule() {
        let schedule = ProgressSchedule::default();
        assert_eq!(schedule.checkpoints_for(900), vec![99, 250, 450, 649, 846, 900]);
        assert_eq!(schedule.checkpoints_for(1000), vec![111, 278, 500, 722, 941, 1000]);
        assert_eq!(schedule.checkpoints_for(0), vec![0; 6]);
    }

    #[test]
    fn test_checkpoints_are_monotone() {
        let schedule = ProgressSchedule::default();
        for total in [1, 2, 7, 13, 847, 600_000] {
            let checkpoints = schedule.checkpoints_for(total);
            assert!(checkpoints.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(checkpoints.last().copied(), Some(total));
        }
    }

    #[tokio::test]
    async fn test_emit_calls_back_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancellationToken::new();

        let recorder = seen.clone();
        ProgressSchedule::immediate()
            .emit(10, &cancel, move |analyzed, total| {
                let recorder = recorder.clone();
                async move {
                    recorder.lock().unwrap().push((analyzed, total));
                    Ok(())
                }
            })
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        assert_eq!(seen.last(), Some(&(10, 10)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pacing() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(Mutex::new(0u32));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2000)).await;
            trigger.cancel();
        });

        let counter = calls.clone();
        let result = ProgressSchedule::default()
            .emit(900, &cancel, move |_, _| {
                let counter = counter.clone();
                async move {
                    *counter.lock().unwrap() += 1;
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(ProgressError::Cancelled)));
        // One checkpoint at 1.5s, cancelled during the second delay
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_error_stops_emission() {
        let cancel = CancellationToken::new();
        let result = ProgressSchedule::immediate()
            .emit(5, &cancel, |_, _| async {
                Err(StoreError::NotFound("gone".to_string()))
            })
            .await;
        assert!(matches!(result, Err(ProgressError::Store(StoreError::NotFound(_)))));
    }
}
