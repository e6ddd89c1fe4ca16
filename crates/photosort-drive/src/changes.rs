//! Change feed for incremental synchronization
//!
//! Implements the cursor-based change feed of the Drive API:
//!
//! 1. **Initial cursor**: [`start_cursor`] returns a token representing
//!    "everything up to now has been seen".
//! 2. **Incremental pull**: [`changes_page`] returns one page of changes
//!    recorded after a cursor, plus either the next page token or, on the
//!    last page, a fresh start cursor for the next pull.
//!
//! Cursor persistence across pages is deliberately left to the caller: the
//! delta puller must not advance its durable cursor until every page of a
//! batch has been applied.

use serde::Deserialize;
use tracing::debug;

use photosort_core::domain::newtypes::{PageCursor, RemoteId};
use photosort_core::ports::{ChangeRecord, ChangesPage, ProviderError};

use crate::client::DriveClient;
use crate::files::{to_remote_child, DriveFile};

/// Changes requested per page
const PAGE_SIZE: &str = "500";

/// Field projection for change listings
const CHANGE_FIELDS: &str = "nextPageToken, newStartPageToken, changes(changeType, fileId, removed, file(id, name, mimeType, size, md5Checksum, createdTime, modifiedTime, parents, trashed, imageMediaMetadata(width, height, time), videoMediaMetadata(width, height, durationMillis)))";

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// Response from `GET /changes/startPageToken`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPageTokenResponse {
    /// The fresh cursor
    start_page_token: String,
}

/// Response from `GET /changes`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeListResponse {
    /// Changes on this page, in provider order
    #[serde(default)]
    changes: Vec<DriveChange>,
    /// Token for the next page (present when more pages exist)
    next_page_token: Option<String>,
    /// Fresh start cursor (present only on the last page)
    new_start_page_token: Option<String>,
}

/// A single change entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveChange {
    /// "file" or "drive"; only file changes are relevant here
    change_type: Option<String>,
    /// Id of the changed file
    file_id: Option<String>,
    /// True when the file was removed or access was lost
    removed: Option<bool>,
    /// Current file state (absent for removals)
    file: Option<DriveFile>,
}

// ============================================================================
// Mapping
// ============================================================================

/// Maps a wire change onto the port-level [`ChangeRecord`]
///
/// Returns `None` for non-file changes (shared-drive membership events and
/// the like) and for malformed entries without a file id.
fn to_change_record(change: DriveChange) -> Result<Option<ChangeRecord>, ProviderError> {
    if let Some(change_type) = change.change_type.as_deref() {
        if change_type != "file" {
            return Ok(None);
        }
    }

    let Some(file_id) = change.file_id else {
        return Ok(None);
    };
    let Ok(file_id) = RemoteId::new(file_id) else {
        return Ok(None);
    };

    let child = change.file.map(to_remote_child).transpose()?;

    Ok(Some(ChangeRecord {
        file_id,
        removed: change.removed.unwrap_or(false),
        child,
    }))
}

// ============================================================================
// Feed operations
// ============================================================================

/// Fetches a fresh change cursor representing "now"
pub async fn start_cursor(
    client: &DriveClient,
    access_token: &str,
) -> Result<PageCursor, ProviderError> {
    let response: StartPageTokenResponse = client
        .get_with_backoff(
            "/changes/startPageToken",
            access_token,
            &[],
            "changes.getStartPageToken",
        )
        .await?
        .json()
        .await
        .map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse startPageToken response: {e}"))
        })?;

    let cursor = PageCursor::new(response.start_page_token)
        .map_err(|e| ProviderError::InvalidResponse(format!("empty start cursor: {e}")))?;

    debug!(cursor = %cursor, "Obtained fresh change cursor");
    Ok(cursor)
}

/// Fetches one page of changes recorded after `cursor`
pub async fn changes_page(
    client: &DriveClient,
    access_token: &str,
    cursor: &PageCursor,
) -> Result<ChangesPage, ProviderError> {
    let params: Vec<(&str, &str)> = vec![
        ("pageToken", cursor.as_str()),
        ("pageSize", PAGE_SIZE),
        ("includeRemoved", "true"),
        ("fields", CHANGE_FIELDS),
    ];

    let response: ChangeListResponse = client
        .get_with_backoff("/changes", access_token, &params, "changes.list")
        .await?
        .json()
        .await
        .map_err(|e| {
            ProviderError::InvalidResponse(format!("failed to parse changes.list response: {e}"))
        })?;

    let mut changes = Vec::with_capacity(response.changes.len());
    for change in response.changes {
        if let Some(record) = to_change_record(change)? {
            changes.push(record);
        }
    }

    let next_page = response
        .next_page_token
        .map(PageCursor::new)
        .transpose()
        .map_err(|e| ProviderError::InvalidResponse(format!("empty next page token: {e}")))?;

    let new_start_cursor = response
        .new_start_page_token
        .map(PageCursor::new)
        .transpose()
        .map_err(|e| ProviderError::InvalidResponse(format!("empty new start cursor: {e}")))?;

    debug!(
        changes = changes.len(),
        has_next = next_page.is_some(),
        has_new_cursor = new_start_cursor.is_some(),
        "Received changes page"
    );

    Ok(ChangesPage {
        changes,
        next_page,
        new_start_cursor,
    })
}

// ============================================================================
// Tests
// ============================================================================
