//! Mirror repository port (driven/secondary port)
//!
//! This module defines the interface for persisting the local relational
//! mirror of the remote tree: folders, media items, sync state, and sync
//! settings.
//!
//! ## Design Notes
//!
//! - Every folder/item write is a full-row upsert keyed on the natural
//!   remote identity `(user_id, remote_id)`, which makes the indexer and
//!   delta puller safely re-entrant: replaying the same remote state
//!   produces no duplicate rows and no lost updates.
//! - `SyncState` is persisted as a whole row guarded by an optimistic
//!   `version` counter; a concurrent writer surfaces as
//!   [`StoreError::Conflict`] instead of silently interleaving.
//! - An item referencing a not-yet-seen parent folder is still written; the
//!   path cache is simply left stale until the parent is indexed.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{
    newtypes::{RemoteId, UserId},
    FolderRecord, MediaItem, SyncSettings, SyncState,
};

// ============================================================================
// StoreError
// ============================================================================

/// Errors that can occur in the persistence adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An optimistic-lock write lost the race to a concurrent writer
    #[error("Concurrent modification: {0}")]
    Conflict(String),
}

// ============================================================================
// IMirrorRepository trait
// ============================================================================

/// Port trait for the local mirror store
#[async_trait::async_trait]
pub trait IMirrorRepository: Send + Sync {
    // --- Folder operations ---

    /// Upserts a folder row keyed on `(user_id, remote_id)`
    async fn upsert_folder(&self, folder: &FolderRecord) -> Result<(), StoreError>;

    /// Retrieves a folder row by its remote id
    async fn get_folder(
        &self,
        user_id: &UserId,
        remote_id: &RemoteId,
    ) -> Result<Option<FolderRecord>, StoreError>;

    // --- Item operations ---

    /// Upserts an item row keyed on `(user_id, remote_id)`
    async fn upsert_item(&self, item: &MediaItem) -> Result<(), StoreError>;

    /// Retrieves an item row by its remote id
    async fn get_item(
        &self,
        user_id: &UserId,
        remote_id: &RemoteId,
    ) -> Result<Option<MediaItem>, StoreError>;

    /// Counts items grouped by status for diagnostics
    ///
    /// Returns a map from status name ("active", "missing", "deleted") to count.
    async fn count_items_by_status(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, u64>, StoreError>;

    /// Marks items not re-observed since `cutoff` as origin-missing
    ///
    /// Targets rows with an active origin whose `last_sync_seen_at` is null
    /// or older than `cutoff`, excluding explicitly deleted items. Stamps
    /// `origin_missing_since = now`, clears the denormalized origin-folder
    /// name, and returns the number of rows transitioned. One UPDATE, so the
    /// sweep is atomic.
    async fn mark_unseen_items_missing(
        &self,
        user_id: &UserId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    // --- Sync state operations ---

    /// Retrieves the singleton sync state row for a user
    async fn get_sync_state(&self, user_id: &UserId) -> Result<Option<SyncState>, StoreError>;

    /// Persists the sync state as one atomic whole-row write
    ///
    /// The write is guarded by the version the state was read at: if the
    /// stored row has moved on, the call fails with [`StoreError::Conflict`]
    /// and nothing is written. Returns the new version on success.
    async fn save_sync_state(&self, state: &SyncState) -> Result<i64, StoreError>;

    // --- Sync settings operations ---

    /// Retrieves the chosen root folder for a user
    async fn get_sync_settings(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SyncSettings>, StoreError>;

    /// Upserts the chosen root folder for a user
    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<(), StoreError>;
}
