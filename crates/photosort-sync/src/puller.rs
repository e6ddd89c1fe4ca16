//! Incremental change application (delta pull)
//!
//! Consumes the provider change feed from the persisted cursor, applying
//! additions, modifications and removals to the mirror, then advances the
//! cursor. Two rules keep this safe under partial failure:
//!
//! - Changes are applied in the order the provider returns them within a
//!   page, and pages in feed order.
//! - The new cursor is persisted only after every page of the batch has
//!   been applied. A crash in between causes the same batch to be re-pulled
//!   and re-applied, which is harmless because all writes are idempotent
//!   upserts.
//!
//! A cursor the provider rejects is a deliberate consistency-loss event:
//! the puller re-initializes a fresh cursor, reports `reset = true`, and
//! logs loudly instead of silently swallowing the gap.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use photosort_core::domain::newtypes::UserId;
use photosort_core::domain::{FolderRecord, SyncState};
use photosort_core::ports::{
    ChangeRecord, IDriveProvider, IMirrorRepository, ProviderError, RemoteChild,
};

use crate::runner::SyncRunner;
use crate::SyncError;

/// Outcome of one delta pull
#[derive(Debug, Clone, Copy)]
pub struct AppliedChanges {
    /// Number of changes applied to the mirror
    pub processed: u64,
    /// True when the cursor was rejected and re-initialized (changes between
    /// the old and new cursor are unaccounted for)
    pub reset: bool,
}

/// Applies the remote change feed to the mirror
pub struct DeltaPuller {
    provider: Arc<dyn IDriveProvider>,
    repo: Arc<dyn IMirrorRepository>,
    runner: SyncRunner,
}

impl DeltaPuller {
    /// Creates a puller over the given provider and repository
    pub fn new(provider: Arc<dyn IDriveProvider>, repo: Arc<dyn IMirrorRepository>) -> Self {
        let runner = SyncRunner::new(provider.clone(), repo.clone());
        Self {
            provider,
            repo,
            runner,
        }
    }

    /// Pulls and applies all pending changes for a user
    ///
    /// `state` is the freshly loaded sync state; the caller persists it
    /// after this returns. With no cursor established yet this initializes
    /// one and applies nothing (there is nothing to delta against).
    pub async fn pull(
        &self,
        user_id: &UserId,
        access_token: &str,
        state: &mut SyncState,
    ) -> Result<AppliedChanges, SyncError> {
        let Some(mut cursor) = state.change_cursor().cloned() else {
            let fresh = self.provider.start_cursor(access_token).await?;
            info!(user = %user_id, cursor = %fresh, "Initialized change cursor");
            state.set_change_cursor(fresh, Utc::now());
            return Ok(AppliedChanges {
                processed: 0,
                reset: false,
            });
        };

        let mut processed: u64 = 0;
        let mut pages: u32 = 0;

        loop {
            let page = match self.provider.changes_page(access_token, &cursor).await {
                Ok(page) => page,
                Err(ProviderError::CursorInvalid(reason)) => {
                    // Self-heal, but make the gap visible: anything recorded
                    // between the rejected cursor and the fresh one is lost.
                    warn!(
                        user = %user_id,
                        %reason,
                        "Change cursor rejected by provider, re-initializing"
                    );
                    let fresh = self.provider.start_cursor(access_token).await?;
                    state.set_change_cursor(fresh, Utc::now());
                    return Ok(AppliedChanges {
                        processed,
                        reset: true,
                    });
                }
                Err(e) => return Err(e.into()),
            };

            pages += 1;
            for change in page.changes {
                self.apply_change(user_id, change).await?;
                processed += 1;
            }

            if let Some(next) = page.next_page {
                cursor = next;
                continue;
            }

            // Last page: advance the durable cursor only now, after the
            // whole batch has been applied.
            if let Some(fresh) = page.new_start_cursor {
                state.set_change_cursor(fresh, Utc::now());
            } else {
                warn!(user = %user_id, "Change feed ended without a new start cursor");
            }
            break;
        }

        debug!(user = %user_id, processed, pages, "Delta pull complete");
        Ok(AppliedChanges {
            processed,
            reset: false,
        })
    }

    /// Counts pending changes without applying them (dry run)
    ///
    /// Returns 0 when no cursor has been established yet; initializing one
    /// is the pull's job, and a read-only peek must not mutate state.
    pub async fn peek(
        &self,
        user_id: &UserId,
        access_token: &str,
        state: &SyncState,
    ) -> Result<u64, SyncError> {
        let Some(mut cursor) = state.change_cursor().cloned() else {
            return Ok(0);
        };

        let mut pending: u64 = 0;
        loop {
            let page = match self.provider.changes_page(access_token, &cursor).await {
                Ok(page) => page,
                // A dead cursor means the real count is unknown; the next
                // pull will reset it. Report what is known: nothing.
                Err(ProviderError::CursorInvalid(_)) => return Ok(pending),
                Err(e) => return Err(e.into()),
            };

            pending += page.changes.len() as u64;
            match page.next_page {
                Some(next) => cursor = next,
                None => break,
            }
        }

        debug!(user = %user_id, pending, "Peeked change feed");
        Ok(pending)
    }

    /// Applies one change record to the mirror
    async fn apply_change(&self, user_id: &UserId, change: ChangeRecord) -> Result<(), SyncError> {
        let trashed = change
            .child
            .as_ref()
            .map(|c| c.trashed)
            .unwrap_or(false);

        if change.removed || trashed {
            return self.apply_removal(user_id, &change).await;
        }

        let Some(child) = change.child else {
            // Neither a removal nor a payload; nothing to apply.
            return Ok(());
        };

        if child.is_folder {
            self.apply_folder_change(user_id, child).await
        } else {
            self.apply_item_change(user_id, child).await
        }
    }

    /// Marks the referenced item (or folder) as gone
    ///
    /// Items become `missing`, never hard-deleted, so metadata attached to
    /// them survives; folders are flagged trashed.
    async fn apply_removal(&self, user_id: &UserId, change: &ChangeRecord) -> Result<(), SyncError> {
        let now = Utc::now();

        if let Some(mut item) = self.repo.get_item(user_id, &change.file_id).await? {
            debug!(user = %user_id, item = %change.file_id, "Change feed reports item removed");
            item.mark_missing(now);
            self.repo.upsert_item(&item).await?;
            return Ok(());
        }

        if let Some(mut folder) = self.repo.get_folder(user_id, &change.file_id).await? {
            debug!(user = %user_id, folder = %change.file_id, "Change feed reports folder removed");
            folder.trashed = true;
            folder.updated_at = now;
            self.repo.upsert_folder(&folder).await?;
        }

        // Removals for rows the mirror never saw are ignorable.
        Ok(())
    }

    /// Upserts a folder reported by the change feed
    async fn apply_folder_change(
        &self,
        user_id: &UserId,
        child: RemoteChild,
    ) -> Result<(), SyncError> {
        let parent_id = child.parents.first().cloned();

        let mut folder = FolderRecord::new(*user_id, child.id, child.name.clone(), parent_id);
        folder.trashed = child.trashed;

        // Refresh the cached path lazily from the parent, when known.
        if let Some(parent_id) = folder.parent_id.clone() {
            if let Some(parent) = self.repo.get_folder(user_id, &parent_id).await? {
                folder.cached_path = Some(parent.child_path(&child.name));
            }
        }

        self.repo.upsert_folder(&folder).await?;
        Ok(())
    }

    /// Upserts a file reported by the change feed
    ///
    /// The origin folder name is re-derived from the file's current first
    /// parent, so folder moves refresh the denormalized field.
    async fn apply_item_change(
        &self,
        user_id: &UserId,
        child: RemoteChild,
    ) -> Result<(), SyncError> {
        let Some(parent_id) = child.parents.first().cloned() else {
            // A file with no visible parent is outside the mirrored tree.
            debug!(user = %user_id, item = %child.id, "Skipping change for parentless file");
            return Ok(());
        };

        let parent = self.repo.get_folder(user_id, &parent_id).await?;
        self.runner
            .upsert_child_item(user_id, &parent_id, parent.as_ref(), child)
            .await
    }
}
