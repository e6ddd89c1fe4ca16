//! Sync state machine and engine facade
//!
//! The [`SyncEngine`] owns the per-user status lattice
//! (`idle -> running -> idle | error`) and exposes the operations the web
//! layer calls: arm, budgeted batch, delta pull, peek, diagnostics.
//!
//! ## Mutual exclusion
//!
//! At most one batch (or pull) is in flight per user:
//! - In-process, a per-user try-lock refuses overlapping invocations with
//!   [`SyncError::Busy`]; the caller polls and retries.
//! - Across processes, the sync-state row's optimistic version turns a lost
//!   race into [`StoreError::Conflict`](photosort_core::ports::StoreError)
//!   instead of interleaved writes. Work already written by the losing
//!   batch is harmless: every mirror write is an idempotent upsert.
//!
//! `arm_sync` deliberately takes no lock. Re-arming while a batch runs is
//! the folder-selection race the version guard exists for: the in-flight
//! batch's final state write loses the compare-and-swap and fails, leaving
//! the freshly armed state authoritative.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use photosort_core::domain::newtypes::{RemoteId, UserId};
use photosort_core::domain::{FolderRecord, SyncSettings, SyncState, SyncStats, SyncStatus};
use photosort_core::ports::{
    IAccessTokenSource, IDriveProvider, IMirrorRepository, INotificationSink,
};

use crate::puller::DeltaPuller;
use crate::reconciler::Reconciler;
use crate::runner::SyncRunner;
use crate::SyncError;

// ============================================================================
// Outcome types
// ============================================================================

/// Result of one budgeted indexing batch
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchOutcome {
    /// True once the pending queue is drained
    pub done: bool,
    /// Folders fully expanded by this batch
    pub processed_folders: u64,
    /// Item rows upserted by this batch
    pub updated_items: u64,
    /// Folder rows discovered by this batch
    pub found_folders: u64,
}

/// Result of one delta pull
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PullOutcome {
    /// Changes applied to the mirror
    pub processed: u64,
    /// True when the cursor was rejected and re-initialized
    pub reset: bool,
}

/// Read-only snapshot for support and debugging
#[derive(Debug, Clone, Serialize)]
pub struct SyncDiagnostics {
    /// The chosen root folder, if any
    pub settings: Option<SyncSettings>,
    /// The persisted sync state, if any
    pub state: Option<SyncState>,
    /// Item counts grouped by status
    pub item_counts: std::collections::HashMap<String, u64>,
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Orchestrator for per-user drive synchronization
pub struct SyncEngine {
    provider: Arc<dyn IDriveProvider>,
    repo: Arc<dyn IMirrorRepository>,
    tokens: Arc<dyn IAccessTokenSource>,
    runner: SyncRunner,
    puller: DeltaPuller,
    reconciler: Reconciler,
    /// Per-user batch leases; at most one batch/pull in flight per user
    batch_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl SyncEngine {
    /// Creates an engine over the given ports
    pub fn new(
        provider: Arc<dyn IDriveProvider>,
        repo: Arc<dyn IMirrorRepository>,
        tokens: Arc<dyn IAccessTokenSource>,
        notifier: Arc<dyn INotificationSink>,
    ) -> Self {
        let runner = SyncRunner::new(provider.clone(), repo.clone());
        let puller = DeltaPuller::new(provider.clone(), repo.clone());
        let reconciler = Reconciler::new(repo.clone(), notifier);
        Self {
            provider,
            repo,
            tokens,
            runner,
            puller,
            reconciler,
            batch_locks: DashMap::new(),
        }
    }

    fn lease_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.batch_locks
            .entry(*user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ========================================================================
    // arm
    // ========================================================================

    /// Re-arms synchronization for a (possibly new) root folder
    ///
    /// Persists the settings, resets the state (queue = `[root]`, cursor and
    /// counters discarded) and writes the root folder row. Callable at any
    /// time; this is also the only recovery path out of the error state.
    #[tracing::instrument(skip(self, folder_name, folder_path))]
    pub async fn arm_sync(
        &self,
        user_id: UserId,
        folder_id: RemoteId,
        folder_name: &str,
        folder_path: &str,
    ) -> Result<(), SyncError> {
        let now = Utc::now();

        let settings = SyncSettings {
            user_id,
            drive_folder_id: folder_id.clone(),
            folder_name: folder_name.to_string(),
            folder_path: folder_path.to_string(),
        };
        self.repo.save_sync_settings(&settings).await?;

        let root = FolderRecord::new(user_id, folder_id.clone(), folder_name, None)
            .with_path(folder_path);
        self.repo.upsert_folder(&root).await?;

        let mut state = self
            .repo
            .get_sync_state(&user_id)
            .await?
            .unwrap_or_else(|| SyncState::unarmed(user_id));
        state.arm(folder_id.clone(), now);
        self.repo.save_sync_state(&state).await?;

        info!(user = %user_id, root = %folder_id, "Sync armed");
        Ok(())
    }

    // ========================================================================
    // run_sync_batch
    // ========================================================================

    /// Runs one bounded step of full-tree indexing
    ///
    /// Expands up to `folder_budget` folders from the pending queue. On the
    /// call that drains the queue, reconciles orphans against the scan start
    /// and establishes the change cursor if none exists yet.
    #[tracing::instrument(skip(self))]
    pub async fn run_sync_batch(
        &self,
        user_id: UserId,
        folder_budget: usize,
    ) -> Result<BatchOutcome, SyncError> {
        let lease = self.lease_for(&user_id);
        let Ok(_guard) = lease.try_lock() else {
            return Err(SyncError::Busy);
        };

        match self.run_batch_locked(&user_id, folder_budget).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.poisons_state() {
                    self.fail_state(&user_id, &e).await;
                }
                Err(e)
            }
        }
    }

    async fn run_batch_locked(
        &self,
        user_id: &UserId,
        folder_budget: usize,
    ) -> Result<BatchOutcome, SyncError> {
        let settings = self
            .repo
            .get_sync_settings(user_id)
            .await?
            .ok_or(SyncError::NotArmed)?;
        let mut state = self
            .repo
            .get_sync_state(user_id)
            .await?
            .ok_or(SyncError::NotArmed)?;
        let armed_root = state.root_folder_id().cloned().ok_or(SyncError::NotArmed)?;

        // Guard against a folder-selection race between the UI and a
        // running sync: never silently index the wrong tree.
        if armed_root != settings.drive_folder_id {
            return Err(SyncError::RootMismatch {
                armed: armed_root.as_str().to_string(),
                selected: settings.drive_folder_id.as_str().to_string(),
            });
        }

        if state.status() == SyncStatus::Error {
            return Err(SyncError::InErrorState(
                state.last_error().unwrap_or("unknown").to_string(),
            ));
        }

        if state.pending_folders().is_empty() {
            // Already fully indexed; nothing to expand and nothing to
            // reconcile (the draining batch already did).
            return Ok(BatchOutcome {
                done: true,
                processed_folders: 0,
                updated_items: 0,
                found_folders: 0,
            });
        }

        let access_token = self.tokens.ensure_valid_access_token(user_id).await?;

        let budget = folder_budget.max(1);
        let taken = state.take_pending(budget);

        let walk = self
            .runner
            .expand_folders(user_id, &access_token, &taken)
            .await?;

        state.extend_pending(walk.discovered);
        state.record_batch(walk.stats);

        let done = state.pending_folders().is_empty();
        if done {
            self.finalize_full_pass(user_id, &access_token, &mut state)
                .await?;
        }

        self.repo.save_sync_state(&state).await?;

        info!(
            user = %user_id,
            processed = walk.stats.processed_folders,
            items = walk.stats.updated_items,
            folders = walk.stats.found_folders,
            pending = state.pending_folders().len(),
            done,
            "Sync batch complete"
        );

        Ok(BatchOutcome {
            done,
            processed_folders: walk.stats.processed_folders,
            updated_items: walk.stats.updated_items,
            found_folders: walk.stats.found_folders,
        })
    }

    /// Completion work for the batch that drained the queue
    ///
    /// Order matters: the orphan sweep runs before the state write that
    /// records completion, and the change cursor is only established once
    /// real data exists. The cursor obtained here is the first point after
    /// which the just-completed walk is authoritative.
    async fn finalize_full_pass(
        &self,
        user_id: &UserId,
        access_token: &str,
        state: &mut SyncState,
    ) -> Result<(), SyncError> {
        let now = Utc::now();

        if let Some(scan_started_at) = state.scan_started_at() {
            self.reconciler.reconcile(user_id, scan_started_at).await?;
        } else {
            warn!(user = %user_id, "Full pass completed without a scan start timestamp; skipping reconciliation");
        }

        if state.change_cursor().is_none() {
            let cursor = self.provider.start_cursor(access_token).await?;
            info!(user = %user_id, cursor = %cursor, "Full pass complete, change cursor established");
            state.set_change_cursor(cursor, now);
        }

        state.complete_full_scan(now);
        Ok(())
    }

    /// Best-effort transition to the error state with `last_error` populated
    async fn fail_state(&self, user_id: &UserId, cause: &SyncError) {
        let state = match self.repo.get_sync_state(user_id).await {
            Ok(Some(state)) => Some(state),
            Ok(None) => None,
            Err(e) => {
                error!(user = %user_id, error = %e, "Failed to load state for error transition");
                None
            }
        };
        let Some(mut state) = state else { return };

        state.fail(cause.to_string());
        if let Err(e) = self.repo.save_sync_state(&state).await {
            error!(user = %user_id, error = %e, "Failed to persist error state");
        } else {
            warn!(user = %user_id, cause = %cause, "Sync transitioned to error state");
        }
    }

    // ========================================================================
    // pull_changes / peek_changes
    // ========================================================================

    /// Applies pending remote changes to the mirror (the "refresh" path)
    ///
    /// Cheap compared to a full pass: only the change feed is consumed, the
    /// tree is not re-walked.
    #[tracing::instrument(skip(self))]
    pub async fn pull_changes(&self, user_id: UserId) -> Result<PullOutcome, SyncError> {
        let lease = self.lease_for(&user_id);
        let Ok(_guard) = lease.try_lock() else {
            return Err(SyncError::Busy);
        };

        match self.pull_changes_locked(&user_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.poisons_state() {
                    self.fail_state(&user_id, &e).await;
                }
                Err(e)
            }
        }
    }

    async fn pull_changes_locked(&self, user_id: &UserId) -> Result<PullOutcome, SyncError> {
        let mut state = self
            .repo
            .get_sync_state(user_id)
            .await?
            .ok_or(SyncError::NotArmed)?;

        let access_token = self.tokens.ensure_valid_access_token(user_id).await?;

        let applied = self.puller.pull(user_id, &access_token, &mut state).await?;

        self.repo.save_sync_state(&state).await?;

        info!(
            user = %user_id,
            processed = applied.processed,
            reset = applied.reset,
            "Pulled remote changes"
        );

        Ok(PullOutcome {
            processed: applied.processed,
            reset: applied.reset,
        })
    }

    /// Counts pending remote changes without applying them
    ///
    /// Dry-run variant of the delta pull, used for UI badges. Mutates
    /// nothing, including the cursor.
    pub async fn peek_changes(&self, user_id: UserId) -> Result<u64, SyncError> {
        let state = self
            .repo
            .get_sync_state(&user_id)
            .await?
            .ok_or(SyncError::NotArmed)?;

        let access_token = self.tokens.ensure_valid_access_token(&user_id).await?;
        self.puller.peek(&user_id, &access_token, &state).await
    }

    // ========================================================================
    // diagnostics
    // ========================================================================

    /// Read-only snapshot of settings, state and item counts
    pub async fn get_sync_diagnostics(
        &self,
        user_id: UserId,
    ) -> Result<SyncDiagnostics, SyncError> {
        let settings = self.repo.get_sync_settings(&user_id).await?;
        let state = self.repo.get_sync_state(&user_id).await?;
        let item_counts = self.repo.count_items_by_status(&user_id).await?;

        Ok(SyncDiagnostics {
            settings,
            state,
            item_counts,
        })
    }

    /// Accumulated counters of the current pass, for progress displays
    pub async fn current_stats(&self, user_id: UserId) -> Result<Option<SyncStats>, SyncError> {
        Ok(self
            .repo
            .get_sync_state(&user_id)
            .await?
            .map(|s| s.stats()))
    }
}
