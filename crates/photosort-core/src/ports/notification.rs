//! Notification sink port (driven/secondary port)
//!
//! The reconciler records one [`OrphanNotice`] per full pass that orphaned
//! items, for later user-facing display by the host application.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery is adapter-specific and the
//!   engine does not branch on the failure kind; a failed notification is
//!   logged, never fatal to the pass that produced it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::newtypes::UserId;

/// Record of one orphan-reconciliation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanNotice {
    /// Owning user
    pub user_id: UserId,
    /// Number of items transitioned to origin-missing
    pub missing_count: u64,
    /// Start of the full pass the sweep ran against
    pub scan_started_at: DateTime<Utc>,
    /// When the sweep ran
    pub detected_at: DateTime<Utc>,
}

/// Port trait for recording orphan-detection events
#[async_trait::async_trait]
pub trait INotificationSink: Send + Sync {
    /// Records one orphan notice for later display
    async fn record_orphans(&self, notice: &OrphanNotice) -> anyhow::Result<()>;
}
