//! Children listing for the Drive `files.list` endpoint
//!
//! Lists the immediate children of one folder, following `nextPageToken`
//! pagination until the folder is exhausted, and maps the wire DTOs onto the
//! port-level [`RemoteChild`] type.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use photosort_core::domain::item::{MediaKind, MediaMetadata};
use photosort_core::domain::newtypes::RemoteId;
use photosort_core::ports::{ProviderError, RemoteChild};

use crate::client::DriveClient;

/// MIME type the Drive API uses for folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Items requested per page
const PAGE_SIZE: &str = "1000";

/// Field projection for children listings
const FILE_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size, md5Checksum, createdTime, modifiedTime, parents, trashed, imageMediaMetadata(width, height, time), videoMediaMetadata(width, height, durationMillis))";

// ============================================================================
// Drive API response types (JSON deserialization)
// ============================================================================

/// Response from `GET /files`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileListResponse {
    /// Files on this page
    #[serde(default)]
    files: Vec<DriveFile>,
    /// Token for the next page (absent on the last page)
    next_page_token: Option<String>,
}

/// A file resource from the Drive API
///
/// Numeric fields (`size`, `durationMillis`) arrive as strings because the
/// API serializes int64 values as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveFile {
    /// File id within the drive
    pub(crate) id: String,
    /// File or folder name
    #[serde(default)]
    pub(crate) name: String,
    /// MIME type; folders use [`FOLDER_MIME_TYPE`]
    #[serde(default)]
    pub(crate) mime_type: String,
    /// Size in bytes, serialized as a string
    pub(crate) size: Option<String>,
    /// MD5 checksum of the content
    pub(crate) md5_checksum: Option<String>,
    /// Creation time
    pub(crate) created_time: Option<DateTime<Utc>>,
    /// Last modification time
    pub(crate) modified_time: Option<DateTime<Utc>>,
    /// Parent folder ids
    pub(crate) parents: Option<Vec<String>>,
    /// Whether the file is in the trash
    pub(crate) trashed: Option<bool>,
    /// Image metadata (present for photos)
    pub(crate) image_media_metadata: Option<ImageMediaMetadata>,
    /// Video metadata (present for videos)
    pub(crate) video_media_metadata: Option<VideoMediaMetadata>,
}

/// Image facet of a file resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageMediaMetadata {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    /// EXIF capture time, formatted "YYYY:MM:DD HH:MM:SS"
    pub(crate) time: Option<String>,
}

/// Video facet of a file resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoMediaMetadata {
    pub(crate) width: Option<u32>,
    pub(crate) height: Option<u32>,
    /// Duration in milliseconds, serialized as a string
    pub(crate) duration_millis: Option<String>,
}

// ============================================================================
// DTO mapping
// ============================================================================

/// Parses the EXIF time format the Drive API reports for photos
///
/// The value has no timezone; it is interpreted as UTC, which is what the
/// rest of the application assumes for capture timestamps.
fn parse_exif_time(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Maps the media facets of a file onto the domain [`MediaMetadata`]
fn media_metadata(file: &DriveFile) -> Option<MediaMetadata> {
    if let Some(video) = &file.video_media_metadata {
        return Some(MediaMetadata {
            kind: MediaKind::Video,
            width: video.width,
            height: video.height,
            duration_ms: video
                .duration_millis
                .as_deref()
                .and_then(|d| d.parse().ok()),
            captured_at: None,
        });
    }
    if let Some(image) = &file.image_media_metadata {
        return Some(MediaMetadata {
            kind: MediaKind::Photo,
            width: image.width,
            height: image.height,
            duration_ms: None,
            captured_at: image.time.as_deref().and_then(parse_exif_time),
        });
    }
    // Fall back to the MIME type when no facet was reported
    if file.mime_type.starts_with("image/") {
        return Some(MediaMetadata {
            kind: MediaKind::Photo,
            width: None,
            height: None,
            duration_ms: None,
            captured_at: None,
        });
    }
    if file.mime_type.starts_with("video/") {
        return Some(MediaMetadata {
            kind: MediaKind::Video,
            width: None,
            height: None,
            duration_ms: None,
            captured_at: None,
        });
    }
    None
}

/// Converts a wire [`DriveFile`] into a port-level [`RemoteChild`]
pub(crate) fn to_remote_child(file: DriveFile) -> Result<RemoteChild, ProviderError> {
    let id = RemoteId::new(file.id.clone())
        .map_err(|e| ProviderError::InvalidResponse(format!("file without usable id: {e}")))?;

    let parents = file
        .parents
        .clone()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| RemoteId::new(p).ok())
        .collect();

    let media = media_metadata(&file);

    Ok(RemoteChild {
        id,
        name: file.name,
        is_folder: file.mime_type == FOLDER_MIME_TYPE,
        mime_type: file.mime_type,
        size: file.size.as_deref().and_then(|s| s.parse().ok()),
        content_hash: file.md5_checksum,
        created_time: file.created_time,
        modified_time: file.modified_time,
        parents,
        trashed: file.trashed.unwrap_or(false),
        media,
    })
}

// ============================================================================
// Listing
// ============================================================================

/// Lists all children of `folder_id`, exhausting every page
///
/// Trashed children are filtered out server-side; the query asks only for
/// direct children of the given folder.
pub async fn list_children(
    client: &DriveClient,
    access_token: &str,
    folder_id: &RemoteId,
) -> Result<Vec<RemoteChild>, ProviderError> {
    let query = format!("'{}' in parents and trashed = false", folder_id.as_str());

    let mut children = Vec::new();
    let mut page_token: Option<String> = None;
    let mut page_count: u32 = 0;

    loop {
        page_count += 1;

        let mut params: Vec<(&str, &str)> = vec![
            ("q", query.as_str()),
            ("pageSize", PAGE_SIZE),
            ("fields", FILE_FIELDS),
        ];
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        let response: FileListResponse = client
            .get_with_backoff("/files", access_token, &params, "files.list")
            .await?
            .json()
            .await
            .map_err(|e| {
                ProviderError::InvalidResponse(format!("failed to parse files.list response: {e}"))
            })?;

        debug!(
            folder = %folder_id,
            page = page_count,
            files = response.files.len(),
            has_next = response.next_page_token.is_some(),
            "Received children page"
        );

        for file in response.files {
            children.push(to_remote_child(file)?);
        }

        match response.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    debug!(
        folder = %folder_id,
        children = children.len(),
        pages = page_count,
        "Children listing complete"
    );

    Ok(children)
}

// ============================================================================
// Tests
// ============================================================================
