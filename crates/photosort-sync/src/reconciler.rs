//! Orphan reconciliation
//!
//! After a full pass completes, mirror rows that were not re-observed during
//! the pass are transitioned to origin-missing. They are never deleted: a
//! transient permission change, a provider outage, or a move outside the
//! indexed root must not destroy metadata attached to the item. Only an
//! explicit removal signal from the change feed, or a user-initiated delete,
//! removes an item's active status permanently.
//!
//! The sweep must only run against a **completed** pass; running it against
//! an in-progress or failed scan would orphan everything the scan had not
//! reached yet. The engine enforces this by invoking the reconciler solely
//! from the batch that drains the queue.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use photosort_core::domain::newtypes::UserId;
use photosort_core::ports::{IMirrorRepository, INotificationSink, OrphanNotice};

use crate::SyncError;

/// Sweeps items not re-observed by the pass that just completed
pub struct Reconciler {
    repo: Arc<dyn IMirrorRepository>,
    notifier: Arc<dyn INotificationSink>,
}

impl Reconciler {
    /// Creates a reconciler over the given repository and notification sink
    pub fn new(repo: Arc<dyn IMirrorRepository>, notifier: Arc<dyn INotificationSink>) -> Self {
        Self { repo, notifier }
    }

    /// Marks items unseen since `scan_started_at` as missing
    ///
    /// Returns the number of items transitioned. Emits one notification
    /// record when anything was orphaned; a failed notification is logged
    /// and does not fail the pass that produced it.
    pub async fn reconcile(
        &self,
        user_id: &UserId,
        scan_started_at: DateTime<Utc>,
    ) -> Result<u64, SyncError> {
        let now = Utc::now();
        let missing = self
            .repo
            .mark_unseen_items_missing(user_id, scan_started_at, now)
            .await?;

        if missing == 0 {
            debug!(user = %user_id, "Reconciliation found no orphaned items");
            return Ok(0);
        }

        info!(
            user = %user_id,
            missing,
            cutoff = %scan_started_at,
            "Marked items not re-observed during the full pass as missing"
        );

        let notice = OrphanNotice {
            user_id: *user_id,
            missing_count: missing,
            scan_started_at,
            detected_at: now,
        };
        if let Err(e) = self.notifier.record_orphans(&notice).await {
            warn!(user = %user_id, error = %e, "Failed to record orphan notice");
        }

        Ok(missing)
    }
}
