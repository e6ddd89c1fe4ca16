//! Budgeted full-tree walker
//!
//! Implements the Walking phase of the full-tree index: pop up to a budget
//! of folders from the durable pending queue, expand each one completely
//! (all pages), upsert the children, and push newly discovered subfolders
//! back onto the queue. The traversal is an explicit work-list loop rather
//! than recursion, so depth is unbounded and every step is independently
//! checkpoint-able.
//!
//! A batch performs exactly one durable state write at the end; a failure
//! mid-batch leaves the persisted queue untouched, and because all mirror
//! writes are idempotent upserts the partially written rows are safe to
//! re-produce on the next attempt.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use photosort_core::domain::newtypes::{RemoteId, UserId};
use photosort_core::domain::{FolderRecord, MediaItem, SyncStats};
use photosort_core::ports::{IDriveProvider, IMirrorRepository, RemoteChild};

use crate::SyncError;

/// Expands folders from the pending queue within a per-call budget
pub struct SyncRunner {
    provider: Arc<dyn IDriveProvider>,
    repo: Arc<dyn IMirrorRepository>,
}

/// Result of expanding one batch of folders
pub struct WalkOutcome {
    /// Counters for this batch only
    pub stats: SyncStats,
    /// Subfolders discovered in this batch, in observation order
    pub discovered: Vec<RemoteId>,
}

impl SyncRunner {
    /// Creates a runner over the given provider and repository
    pub fn new(provider: Arc<dyn IDriveProvider>, repo: Arc<dyn IMirrorRepository>) -> Self {
        Self { provider, repo }
    }

    /// Fully expands the given folders, upserting children as mirror rows
    ///
    /// Returns the batch counters and the subfolders to queue next. The
    /// caller owns queue persistence.
    pub async fn expand_folders(
        &self,
        user_id: &UserId,
        access_token: &str,
        folders: &[RemoteId],
    ) -> Result<WalkOutcome, SyncError> {
        let mut stats = SyncStats::default();
        let mut discovered = Vec::new();

        for folder_id in folders {
            let children = self
                .provider
                .list_children(access_token, folder_id)
                .await?;

            // The parent row exists for the root (written by arm) and for
            // every folder discovered by an earlier batch; its cached path
            // seeds the children's denormalized paths.
            let parent = self.repo.get_folder(user_id, folder_id).await?;

            debug!(
                user = %user_id,
                folder = %folder_id,
                children = children.len(),
                "Expanding folder"
            );

            for child in children {
                if child.is_folder {
                    self.upsert_child_folder(user_id, folder_id, parent.as_ref(), &child)
                        .await?;
                    discovered.push(child.id);
                    stats.found_folders += 1;
                } else {
                    self.upsert_child_item(user_id, folder_id, parent.as_ref(), child)
                        .await?;
                    stats.updated_items += 1;
                }
            }

            stats.processed_folders += 1;
        }

        Ok(WalkOutcome { stats, discovered })
    }

    async fn upsert_child_folder(
        &self,
        user_id: &UserId,
        parent_id: &RemoteId,
        parent: Option<&FolderRecord>,
        child: &RemoteChild,
    ) -> Result<(), SyncError> {
        let mut folder = FolderRecord::new(
            *user_id,
            child.id.clone(),
            child.name.clone(),
            Some(parent_id.clone()),
        );
        folder.trashed = child.trashed;
        if let Some(parent) = parent {
            folder.cached_path = Some(parent.child_path(&child.name));
        }

        self.repo.upsert_folder(&folder).await?;
        Ok(())
    }

    /// Writes a file leaf as an active item, reactivating it if it was missing
    pub async fn upsert_child_item(
        &self,
        user_id: &UserId,
        parent_id: &RemoteId,
        parent: Option<&FolderRecord>,
        child: RemoteChild,
    ) -> Result<(), SyncError> {
        let now = Utc::now();

        // A re-observation of a missing row indicates the earlier
        // disappearance was transient; that is worth surfacing in the log.
        if let Some(existing) = self.repo.get_item(user_id, &child.id).await? {
            if existing.is_reactivation() {
                info!(
                    user = %user_id,
                    item = %child.id,
                    name = %child.name,
                    "Reactivating item that was previously missing"
                );
            }
        }

        let mut item = MediaItem::observed(
            *user_id,
            child.id.clone(),
            child.name.clone(),
            child.mime_type.clone(),
            now,
        );
        item.size = child.size;
        item.content_hash = child.content_hash;
        item.created_time = child.created_time;
        item.modified_time = child.modified_time;
        item.parents = if child.parents.is_empty() {
            vec![parent_id.clone()]
        } else {
            child.parents
        };
        item.origin_folder_name = Some(
            parent
                .map(|p| p.name.clone())
                .unwrap_or_else(|| parent_id.as_str().to_string()),
        );
        item.media = child.media;

        self.repo.upsert_item(&item).await?;
        Ok(())
    }
}
