//! Folder mirror row
//!
//! A [`FolderRecord`] mirrors one remote folder inside the indexed subtree.
//! Rows are written by the indexer and the delta puller with full-row upsert
//! semantics keyed on `(user_id, remote_id)`; they are never deleted, only
//! marked trashed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RemoteId, UserId};

/// Mirror row for one remote folder
///
/// `parent_id` is a weak reference to another folder of the same user; the
/// provider's tree is acyclic by construction, so no cycle checking is done
/// here. `cached_path` is a denormalized display path ("A / B / C") refreshed
/// lazily. A row written before its parent has been indexed simply carries a
/// stale or absent path until the next pass over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Owning user
    pub user_id: UserId,
    /// Provider-issued folder id (part of the natural key)
    pub remote_id: RemoteId,
    /// Folder name as reported by the provider
    pub name: String,
    /// Parent folder id (None for the sync root)
    pub parent_id: Option<RemoteId>,
    /// Denormalized display path, e.g. "Photos / 2024 / Iceland"
    pub cached_path: Option<String>,
    /// Whether the provider reports the folder as trashed
    pub trashed: bool,
    /// Last time this row was written
    pub updated_at: DateTime<Utc>,
}

impl FolderRecord {
    /// Creates a folder row observed now
    pub fn new(
        user_id: UserId,
        remote_id: RemoteId,
        name: impl Into<String>,
        parent_id: Option<RemoteId>,
    ) -> Self {
        Self {
            user_id,
            remote_id,
            name: name.into(),
            parent_id,
            cached_path: None,
            trashed: false,
            updated_at: Utc::now(),
        }
    }

    /// Sets the denormalized display path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.cached_path = Some(path.into());
        self
    }

    /// Returns the display path for children of this folder
    ///
    /// Children append their name to the parent's cached path with the
    /// " / " separator; if the path cache is cold the child falls back to
    /// just its own name until a later pass refreshes it.
    pub fn child_path(&self, child_name: &str) -> String {
        match &self.cached_path {
            Some(path) => format!("{} / {}", path, child_name),
            None => child_name.to_string(),
        }
    }
}
