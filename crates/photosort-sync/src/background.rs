//! Background full-scan loop
//!
//! Convenience orchestration over the budgeted batch: repeatedly invokes
//! [`SyncEngine::run_sync_batch`] on a fixed delay until the queue drains.
//! Introduces no state of its own; completion work (reconciliation, cursor
//! establishment) happens inside the draining batch exactly as it does for
//! client-driven loops.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use photosort_core::domain::newtypes::UserId;
use photosort_core::domain::SyncStats;

use crate::engine::SyncEngine;
use crate::SyncError;

/// Fixed-delay driver that runs a full pass to completion
pub struct BackgroundSync {
    engine: Arc<SyncEngine>,
    /// Folders expanded per batch
    folder_budget: usize,
    /// Pause between batches
    delay: Duration,
}

impl BackgroundSync {
    /// Creates a background driver over the engine
    pub fn new(engine: Arc<SyncEngine>, folder_budget: usize, delay: Duration) -> Self {
        Self {
            engine,
            folder_budget,
            delay,
        }
    }

    /// Creates a background driver from the application configuration
    pub fn from_config(engine: Arc<SyncEngine>, config: &photosort_core::config::SyncConfig) -> Self {
        Self::new(
            engine,
            config.folder_budget,
            Duration::from_secs(config.background_delay_secs),
        )
    }

    /// Drives the pending queue to empty, then returns the total counters
    ///
    /// A [`SyncError::Busy`] from a concurrent invocation is treated as
    /// backpressure: wait one delay and poll again. Every other error ends
    /// the loop (the engine has already recorded the error state where
    /// appropriate).
    pub async fn run_to_completion(&self, user_id: UserId) -> Result<SyncStats, SyncError> {
        let mut total = SyncStats::default();

        info!(user = %user_id, budget = self.folder_budget, "Background sync starting");

        loop {
            match self.engine.run_sync_batch(user_id, self.folder_budget).await {
                Ok(outcome) => {
                    total.accumulate(SyncStats {
                        processed_folders: outcome.processed_folders,
                        updated_items: outcome.updated_items,
                        found_folders: outcome.found_folders,
                    });

                    if outcome.done {
                        info!(
                            user = %user_id,
                            processed = total.processed_folders,
                            items = total.updated_items,
                            "Background sync complete"
                        );
                        return Ok(total);
                    }

                    debug!(
                        user = %user_id,
                        processed = total.processed_folders,
                        "Background sync batch done, continuing"
                    );
                }
                Err(SyncError::Busy) => {
                    warn!(user = %user_id, "Another batch in flight, backing off");
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.delay).await;
        }
    }
}
