//! Media item mirror row and its status lattice
//!
//! A [`MediaItem`] mirrors one remote file leaf (photo or video). The status
//! lattice distinguishes "moved/renamed" from "deleted" from "merely not
//! re-observed this pass":
//!
//! - `status`: `active` while observed, `missing` when the reconciler or a
//!   removal change stops seeing it, `deleted` only on an explicit removal
//!   signal from the change feed.
//! - `origin_status`: tracks whether the item is still reachable under the
//!   indexed root; a missing origin keeps all other metadata intact so
//!   labels and collections attached to the item survive transient
//!   disappearances.
//!
//! Rows are written with full-row upsert semantics keyed on
//! `(user_id, remote_id)`; re-observation of a missing item reactivates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{RemoteId, UserId};

// ============================================================================
// Status enums
// ============================================================================

/// Overall availability of an item in the mirror
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Observed in the most recent pass or change feed
    #[default]
    Active,
    /// Not re-observed; retained with all metadata
    Missing,
    /// Provider explicitly reported removal
    Deleted,
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Active => write!(f, "active"),
            ItemStatus::Missing => write!(f, "missing"),
            ItemStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Whether the item is still reachable under the indexed root folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginStatus {
    /// Reachable under the current root
    #[default]
    Active,
    /// Not re-observed across a full pass, or removed from the feed
    Missing,
}

impl std::fmt::Display for OriginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OriginStatus::Active => write!(f, "active"),
            OriginStatus::Missing => write!(f, "missing"),
        }
    }
}

// ============================================================================
// Media metadata
// ============================================================================

/// Kind of media leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

/// Provider-reported media facts, when present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Photo or video
    pub kind: MediaKind,
    /// Pixel width
    pub width: Option<u32>,
    /// Pixel height
    pub height: Option<u32>,
    /// Duration in milliseconds (videos only)
    pub duration_ms: Option<u64>,
    /// Capture timestamp from EXIF / container metadata
    pub captured_at: Option<DateTime<Utc>>,
}

// ============================================================================
// MediaItem
// ============================================================================

/// Mirror row for one remote file leaf (photo or video)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Owning user
    pub user_id: UserId,
    /// Provider-issued file id (part of the natural key)
    pub remote_id: RemoteId,
    /// File name
    pub name: String,
    /// MIME type as reported by the provider
    pub mime_type: String,
    /// Size in bytes, when reported
    pub size: Option<u64>,
    /// Provider content hash, when reported
    pub content_hash: Option<String>,
    /// Remote creation time
    pub created_time: Option<DateTime<Utc>>,
    /// Remote last-modified time
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder ids (a file can have several)
    pub parents: Vec<RemoteId>,
    /// Denormalized name of the first parent folder
    pub origin_folder_name: Option<String>,
    /// Media facts (dimensions, duration, capture time)
    pub media: Option<MediaMetadata>,
    /// Availability status
    pub status: ItemStatus,
    /// Reachability under the indexed root
    pub origin_status: OriginStatus,
    /// When the origin was first seen missing (None while active)
    pub origin_missing_since: Option<DateTime<Utc>>,
    /// Last time any observation (scan or change) saw the item
    pub last_seen_at: Option<DateTime<Utc>>,
    /// Last time a sync pass re-observed the item (the reconciler's input)
    pub last_sync_seen_at: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// Creates a freshly observed, active item
    pub fn observed(
        user_id: UserId,
        remote_id: RemoteId,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            remote_id,
            name: name.into(),
            mime_type: mime_type.into(),
            size: None,
            content_hash: None,
            created_time: None,
            modified_time: None,
            parents: Vec::new(),
            origin_folder_name: None,
            media: None,
            status: ItemStatus::Active,
            origin_status: OriginStatus::Active,
            origin_missing_since: None,
            last_seen_at: Some(now),
            last_sync_seen_at: Some(now),
        }
    }

    /// Returns true if a re-observation of this item is a reactivation
    ///
    /// True when the row was previously missing (either status axis); the
    /// caller logs reactivations because they indicate the earlier
    /// disappearance was transient.
    pub fn is_reactivation(&self) -> bool {
        self.status == ItemStatus::Missing || self.origin_status == OriginStatus::Missing
    }

    /// Marks the item active after an observation at `now`
    ///
    /// Clears any missing markers and stamps both seen timestamps.
    pub fn mark_observed(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Active;
        self.origin_status = OriginStatus::Active;
        self.origin_missing_since = None;
        self.last_seen_at = Some(now);
        self.last_sync_seen_at = Some(now);
    }

    /// Marks the item missing (not deleted) at `now`
    ///
    /// Used for explicit removals from the change feed and for orphan
    /// reconciliation. All non-status metadata is retained.
    pub fn mark_missing(&mut self, now: DateTime<Utc>) {
        self.status = ItemStatus::Missing;
        self.origin_status = OriginStatus::Missing;
        if self.origin_missing_since.is_none() {
            self.origin_missing_since = Some(now);
        }
        self.origin_folder_name = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> MediaItem {
        MediaItem::observed(
            UserId::new(),
            RemoteId::new("file-1").unwrap(),
            "x.jpg",
            "image/jpeg",
            Utc::now(),
        )
    }

    #[test]
    fn test_observed_is_active() {
        let i = item();
        assert_eq!(i.status, ItemStatus::Active);
        assert_eq!(i.origin_status, OriginStatus::Active);
        assert!(i.last_sync_seen_at.is_some());
        assert!(!i.is_reactivation());
    }

    #[test]
    fn test_mark_missing_retains_metadata() {
        let mut i = item();
        i.size = Some(42);
        i.content_hash = Some("abc".to_string());
        i.origin_folder_name = Some("Photos".to_string());

        let now = Utc::now();
        i.mark_missing(now);

        assert_eq!(i.status, ItemStatus::Missing);
        assert_eq!(i.origin_status, OriginStatus::Missing);
        assert_eq!(i.origin_missing_since, Some(now));
        assert!(i.origin_folder_name.is_none());
        // Non-status fields survive
        assert_eq!(i.size, Some(42));
        assert_eq!(i.content_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_mark_missing_keeps_first_missing_timestamp() {
        let mut i = item();
        let first = Utc::now();
        i.mark_missing(first);
        let later = first + chrono::Duration::hours(1);
        i.mark_missing(later);
        assert_eq!(i.origin_missing_since, Some(first));
    }

    #[test]
    fn test_reactivation_clears_missing_markers() {
        let mut i = item();
        i.mark_missing(Utc::now());
        assert!(i.is_reactivation());

        let now = Utc::now();
        i.mark_observed(now);
        assert_eq!(i.status, ItemStatus::Active);
        assert_eq!(i.origin_status, OriginStatus::Active);
        assert!(i.origin_missing_since.is_none());
        assert_eq!(i.last_sync_seen_at, Some(now));
        assert!(!i.is_reactivation());
    }
}
