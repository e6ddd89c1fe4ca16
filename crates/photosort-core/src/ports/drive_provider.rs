//! Drive provider port (driven/secondary port)
//!
//! This module defines the interface for interacting with the remote
//! cloud-drive tree. The primary implementation targets the Google Drive v3
//! API, but the trait only speaks in terms of folders, file leaves, and an
//! opaque change cursor.
//!
//! ## Design Notes
//!
//! - Methods return a typed [`ProviderError`] rather than `anyhow::Result`
//!   because callers must classify outcomes: an invalid cursor triggers
//!   self-healing, an authorization failure triggers re-consent, and only
//!   genuinely transient failures are retried.
//! - Transient HTTP failures (429, 5xx) are absorbed by backoff inside the
//!   implementation and surface as [`ProviderError::Unavailable`] only after
//!   the retry ceiling is exhausted.
//! - `list_children` exhausts all pages of one folder before returning;
//!   paging across folders (the breadth-first queue) is the caller's job.
//!   `changes_page` deliberately returns a single page, because the delta
//!   puller must control cursor persistence across pages.
//! - The access token is an argument on every call: one provider instance
//!   serves every user of the application.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::item::MediaMetadata;
use crate::domain::newtypes::{PageCursor, RemoteId};

// ============================================================================
// ProviderError
// ============================================================================

/// Errors surfaced by a drive provider adapter
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The access token was rejected (expired or revoked)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token is valid but lacks a required permission
    #[error("Insufficient scope: {0}")]
    InsufficientScope(String),

    /// The requested folder or file does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The change cursor was rejected as invalid or expired
    #[error("Change cursor invalid: {0}")]
    CursorInvalid(String),

    /// Transient failure after the retry ceiling was exhausted
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Port-level DTOs
// ============================================================================

/// One child of a remote folder, as observed by a listing or a change
///
/// This is a port-level DTO; the sync engine maps it onto
/// [`FolderRecord`](crate::domain::FolderRecord) or
/// [`MediaItem`](crate::domain::MediaItem) rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteChild {
    /// Provider-issued id
    pub id: RemoteId,
    /// File or folder name
    pub name: String,
    /// True for folders, false for file leaves
    pub is_folder: bool,
    /// MIME type as reported by the provider
    pub mime_type: String,
    /// Size in bytes (files only, when reported)
    pub size: Option<u64>,
    /// Provider content hash (files only, when reported)
    pub content_hash: Option<String>,
    /// Remote creation time
    pub created_time: Option<DateTime<Utc>>,
    /// Remote last-modified time
    pub modified_time: Option<DateTime<Utc>>,
    /// Parent folder ids
    pub parents: Vec<RemoteId>,
    /// Whether the provider reports the item as trashed
    pub trashed: bool,
    /// Media facts when the leaf is a photo or video
    pub media: Option<MediaMetadata>,
}

/// One entry from the change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Id of the changed file or folder
    pub file_id: RemoteId,
    /// True when the provider reports the item as removed
    pub removed: bool,
    /// Current state of the item (absent for removals)
    pub child: Option<RemoteChild>,
}

/// One page of the change feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesPage {
    /// Changes in provider order; must be applied in this order
    pub changes: Vec<ChangeRecord>,
    /// Cursor for the next page (None on the last page)
    pub next_page: Option<PageCursor>,
    /// Fresh start cursor (present only on the last page)
    pub new_start_cursor: Option<PageCursor>,
}

// ============================================================================
// IDriveProvider trait
// ============================================================================

/// Port trait for the remote cloud-drive tree
#[async_trait::async_trait]
pub trait IDriveProvider: Send + Sync {
    /// Lists all children of a folder, exhausting every page
    ///
    /// # Arguments
    /// * `access_token` - A currently valid bearer token
    /// * `folder_id` - The folder whose immediate children to list
    async fn list_children(
        &self,
        access_token: &str,
        folder_id: &RemoteId,
    ) -> Result<Vec<RemoteChild>, ProviderError>;

    /// Fetches a fresh change cursor representing "now"
    ///
    /// Everything before the returned cursor is considered already seen.
    async fn start_cursor(&self, access_token: &str) -> Result<PageCursor, ProviderError>;

    /// Fetches one page of changes recorded after `cursor`
    ///
    /// The caller loops over `next_page` until `new_start_cursor` arrives.
    async fn changes_page(
        &self,
        access_token: &str,
        cursor: &PageCursor,
    ) -> Result<ChangesPage, ProviderError>;
}
