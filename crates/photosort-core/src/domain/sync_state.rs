//! Sync state machine entity and per-user sync settings
//!
//! [`SyncState`] is the singleton durable row that carries a user's whole
//! synchronization position: the pending-folder work queue (insertion order
//! is breadth-first order), the status lattice, the change cursor, and the
//! accumulated counters. It is mutated exclusively through the methods here
//! and persisted as one atomic whole-row write per batch; the queue is
//! never partially mutated in place.
//!
//! Invariants:
//! - `status == Running` implies a worker is actively draining the queue.
//! - An empty queue with `status == Idle` means the tree is fully indexed
//!   under `root_folder_id`.
//! - The change cursor is only established once a full pass has completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{PageCursor, RemoteId, UserId};

// ============================================================================
// SyncStatus
// ============================================================================

/// Status of a user's synchronization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// No batch in flight; queue may or may not be drained
    #[default]
    Idle,
    /// A full pass is in progress (queue non-empty)
    Running,
    /// An unrecoverable failure occurred; re-arm to recover
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => write!(f, "idle"),
            SyncStatus::Running => write!(f, "running"),
            SyncStatus::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// SyncStats
// ============================================================================

/// Counters accumulated across the budgeted calls of one full pass
///
/// Monotonically accumulated across resumed runs; reset only on re-arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Folders fully expanded so far
    pub processed_folders: u64,
    /// Item rows upserted so far
    pub updated_items: u64,
    /// Folder rows discovered so far
    pub found_folders: u64,
}

impl SyncStats {
    /// Adds another batch's counters to the running totals
    pub fn accumulate(&mut self, other: SyncStats) {
        self.processed_folders += other.processed_folders;
        self.updated_items += other.updated_items;
        self.found_folders += other.found_folders;
    }
}

// ============================================================================
// SyncState
// ============================================================================

/// Singleton sync position for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// Owning user
    user_id: UserId,
    /// Root folder the queue was seeded from (None before the first arm)
    root_folder_id: Option<RemoteId>,
    /// Folder ids awaiting expansion, in breadth-first order
    pending_folders: Vec<RemoteId>,
    /// Current status
    status: SyncStatus,
    /// Description of the last unrecoverable failure
    last_error: Option<String>,
    /// Change cursor for the delta feed (None until a full pass completes)
    change_cursor: Option<PageCursor>,
    /// When the current pass was seeded (the reconciliation cutoff)
    scan_started_at: Option<DateTime<Utc>>,
    /// When the last full pass completed
    last_full_scan_at: Option<DateTime<Utc>>,
    /// When changes were last pulled
    last_changes_at: Option<DateTime<Utc>>,
    /// Accumulated counters for the current pass
    stats: SyncStats,
    /// Optimistic-lock counter, bumped by the store on every save
    version: i64,
}

impl SyncState {
    /// Creates an empty state for a user that has never armed a sync
    pub fn unarmed(user_id: UserId) -> Self {
        Self {
            user_id,
            root_folder_id: None,
            pending_folders: Vec::new(),
            status: SyncStatus::Idle,
            last_error: None,
            change_cursor: None,
            scan_started_at: None,
            last_full_scan_at: None,
            last_changes_at: None,
            stats: SyncStats::default(),
            version: 0,
        }
    }

    /// Re-arms the state for a (possibly new) root folder
    ///
    /// Unconditionally resets the queue to `[root]`, zeroes the counters and
    /// discards the change cursor, since a different root invalidates the old
    /// feed's meaning. This is also the only recovery path out of
    /// [`SyncStatus::Error`].
    pub fn arm(&mut self, root: RemoteId, now: DateTime<Utc>) {
        self.root_folder_id = Some(root.clone());
        self.pending_folders = vec![root];
        self.status = SyncStatus::Idle;
        self.last_error = None;
        self.change_cursor = None;
        self.scan_started_at = Some(now);
        self.stats = SyncStats::default();
    }

    /// Removes and returns up to `budget` folder ids from the queue front
    pub fn take_pending(&mut self, budget: usize) -> Vec<RemoteId> {
        let n = budget.min(self.pending_folders.len());
        self.pending_folders.drain(..n).collect()
    }

    /// Appends newly discovered folders to the back of the queue
    pub fn extend_pending(&mut self, folders: impl IntoIterator<Item = RemoteId>) {
        self.pending_folders.extend(folders);
    }

    /// Records one batch: accumulates counters and settles the status
    ///
    /// Status becomes `Running` while the queue is non-empty and `Idle` once
    /// drained.
    pub fn record_batch(&mut self, batch: SyncStats) {
        self.stats.accumulate(batch);
        self.status = if self.pending_folders.is_empty() {
            SyncStatus::Idle
        } else {
            SyncStatus::Running
        };
    }

    /// Stamps the completion of a full pass
    ///
    /// Only meaningful once the queue is drained; the reconciler runs against
    /// `scan_started_at` before this is persisted.
    pub fn complete_full_scan(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.pending_folders.is_empty());
        self.status = SyncStatus::Idle;
        self.last_full_scan_at = Some(now);
    }

    /// Transitions to the error state with a description
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = SyncStatus::Error;
        self.last_error = Some(error.into());
    }

    /// Sets the change cursor and stamps the pull time
    pub fn set_change_cursor(&mut self, cursor: PageCursor, now: DateTime<Utc>) {
        self.change_cursor = Some(cursor);
        self.last_changes_at = Some(now);
    }

    /// True once the queue is drained under an armed root
    pub fn is_fully_indexed(&self) -> bool {
        self.root_folder_id.is_some()
            && self.pending_folders.is_empty()
            && self.status == SyncStatus::Idle
    }

    // --- Getters ---

    /// Returns the owning user id
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Returns the armed root folder id, if any
    pub fn root_folder_id(&self) -> Option<&RemoteId> {
        self.root_folder_id.as_ref()
    }

    /// Returns the pending-folder queue in breadth-first order
    pub fn pending_folders(&self) -> &[RemoteId] {
        &self.pending_folders
    }

    /// Returns the current status
    pub fn status(&self) -> SyncStatus {
        self.status
    }

    /// Returns the last unrecoverable error, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the persisted change cursor, if established
    pub fn change_cursor(&self) -> Option<&PageCursor> {
        self.change_cursor.as_ref()
    }

    /// Returns when the current pass was seeded
    pub fn scan_started_at(&self) -> Option<DateTime<Utc>> {
        self.scan_started_at
    }

    /// Returns when the last full pass completed
    pub fn last_full_scan_at(&self) -> Option<DateTime<Utc>> {
        self.last_full_scan_at
    }

    /// Returns when changes were last pulled
    pub fn last_changes_at(&self) -> Option<DateTime<Utc>> {
        self.last_changes_at
    }

    /// Returns the accumulated counters
    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    /// Returns the optimistic-lock version of the row this state was read from
    pub fn version(&self) -> i64 {
        self.version
    }
}

// ============================================================================
// SyncSettings
// ============================================================================

/// The folder a user designated as the synchronization boundary
///
/// Written by `arm_sync` when the user picks a folder; read-only to the rest
/// of the engine. The runner compares `drive_folder_id` against the armed
/// root before every batch to detect folder-selection races.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Owning user
    pub user_id: UserId,
    /// Remote id of the chosen root folder
    pub drive_folder_id: RemoteId,
    /// Display name of the chosen folder
    pub folder_name: String,
    /// Display path of the chosen folder
    pub folder_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RemoteId {
        RemoteId::new(s).unwrap()
    }

    #[test]
    fn test_unarmed_state() {
        let state = SyncState::unarmed(UserId::new());
        assert!(state.root_folder_id().is_none());
        assert!(state.pending_folders().is_empty());
        assert_eq!(state.status(), SyncStatus::Idle);
        assert!(!state.is_fully_indexed());
    }

    #[test]
    fn test_arm_seeds_queue_with_root() {
        let mut state = SyncState::unarmed(UserId::new());
        state.arm(rid("root"), Utc::now());

        assert_eq!(state.root_folder_id(), Some(&rid("root")));
        assert_eq!(state.pending_folders(), &[rid("root")]);
        assert!(state.change_cursor().is_none());
        assert_eq!(state.stats(), SyncStats::default());
        assert!(state.scan_started_at().is_some());
    }

    #[test]
    fn test_arm_resets_cursor_and_error() {
        let mut state = SyncState::unarmed(UserId::new());
        state.arm(rid("a"), Utc::now());
        state.set_change_cursor(PageCursor::new("c1").unwrap(), Utc::now());
        state.fail("provider exploded");
        assert_eq!(state.status(), SyncStatus::Error);

        state.arm(rid("b"), Utc::now());
        assert_eq!(state.status(), SyncStatus::Idle);
        assert!(state.change_cursor().is_none());
        assert!(state.last_error().is_none());
        assert_eq!(state.pending_folders(), &[rid("b")]);
    }

    #[test]
    fn test_take_pending_respects_budget() {
        let mut state = SyncState::unarmed(UserId::new());
        state.arm(rid("root"), Utc::now());
        state.extend_pending([rid("a"), rid("b")]);

        let taken = state.take_pending(2);
        assert_eq!(taken, vec![rid("root"), rid("a")]);
        assert_eq!(state.pending_folders(), &[rid("b")]);

        let rest = state.take_pending(10);
        assert_eq!(rest, vec![rid("b")]);
        assert!(state.pending_folders().is_empty());
    }

    #[test]
    fn test_record_batch_settles_status() {
        let mut state = SyncState::unarmed(UserId::new());
        state.arm(rid("root"), Utc::now());

        let _ = state.take_pending(1);
        state.extend_pending([rid("a")]);
        state.record_batch(SyncStats {
            processed_folders: 1,
            updated_items: 3,
            found_folders: 1,
        });
        assert_eq!(state.status(), SyncStatus::Running);

        let _ = state.take_pending(1);
        state.record_batch(SyncStats {
            processed_folders: 1,
            ..Default::default()
        });
        assert_eq!(state.status(), SyncStatus::Idle);
        assert_eq!(state.stats().processed_folders, 2);
        assert_eq!(state.stats().updated_items, 3);
    }

    #[test]
    fn test_fully_indexed_after_drain_and_complete() {
        let mut state = SyncState::unarmed(UserId::new());
        state.arm(rid("root"), Utc::now());
        let _ = state.take_pending(1);
        state.record_batch(SyncStats::default());
        state.complete_full_scan(Utc::now());

        assert!(state.is_fully_indexed());
        assert!(state.last_full_scan_at().is_some());
    }
}
