//! SQLite implementation of the mirror and credential store ports
//!
//! This module provides the concrete SQLite-based implementation of the
//! `IMirrorRepository` and `ICredentialStore` ports defined in
//! photosort-core. It handles all domain type serialization/deserialization
//! and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                   |
//! |-------------------|----------|--------------------------------------------|
//! | UserId            | TEXT     | UUID string via `.to_string()` / `FromStr` |
//! | RemoteId          | TEXT     | String via `.as_str()` / `RemoteId::new()` |
//! | PageCursor        | TEXT     | String via `.as_str()` / `PageCursor::new()` |
//! | DateTime<Utc>     | TEXT     | RFC 3339 (fixed-width micros) / `DateTime::parse_from_rfc3339()` |
//! | Vec<RemoteId>     | TEXT     | serde_json array                           |
//! | MediaMetadata     | TEXT     | serde_json serialization                   |
//! | ItemStatus et al. | TEXT     | plain string codec                         |
//! | SyncState         | row      | serde_json reconstruction (private fields) |
//! | sealed tokens     | BLOB     | raw bytes (opaque to the store)            |

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use photosort_core::domain::{
    item::{ItemStatus, MediaMetadata, OriginStatus},
    newtypes::{RemoteId, UserId},
    FolderRecord, MediaItem, StoredCredential, SyncSettings, SyncState,
};
use photosort_core::ports::{ICredentialStore, IMirrorRepository, StoreError};

/// SQLite-based implementation of the mirror repository and credential store
///
/// Provides persistent storage for all engine entities using SQLite.
/// All operations are performed through a connection pool for concurrency.
pub struct SqliteMirrorRepository {
    pool: SqlitePool,
}

impl SqliteMirrorRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Serialize an ItemStatus to a string for storage
fn item_status_to_string(status: ItemStatus) -> &'static str {
    match status {
        ItemStatus::Active => "active",
        ItemStatus::Missing => "missing",
        ItemStatus::Deleted => "deleted",
    }
}

/// Deserialize an ItemStatus from its stored string representation
fn item_status_from_string(s: &str) -> Result<ItemStatus, StoreError> {
    match s {
        "active" => Ok(ItemStatus::Active),
        "missing" => Ok(ItemStatus::Missing),
        "deleted" => Ok(ItemStatus::Deleted),
        other => Err(StoreError::SerializationError(format!(
            "Unknown item status: {}",
            other
        ))),
    }
}

/// Serialize an OriginStatus to a string for storage
fn origin_status_to_string(status: OriginStatus) -> &'static str {
    match status {
        OriginStatus::Active => "active",
        OriginStatus::Missing => "missing",
    }
}

/// Deserialize an OriginStatus from its stored string representation
fn origin_status_from_string(s: &str) -> Result<OriginStatus, StoreError> {
    match s {
        "active" => Ok(OriginStatus::Active),
        "missing" => Ok(OriginStatus::Missing),
        other => Err(StoreError::SerializationError(format!(
            "Unknown origin status: {}",
            other
        ))),
    }
}

/// Parse a DateTime<Utc> from an ISO 8601 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Parse an optional DateTime<Utc> from an optional string
fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

/// Serialize a DateTime<Utc> for storage
///
/// Fixed-width microsecond precision so the stored strings compare
/// chronologically; `to_rfc3339()` emits a variable number of fractional
/// digits, which breaks lexicographic ordering within a second.
fn datetime_to_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn optional_datetime_to_string(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(datetime_to_string)
}

fn parse_user_id(s: &str) -> Result<UserId, StoreError> {
    UserId::from_str(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid UserId '{}': {}", s, e)))
}

fn parse_remote_id(s: &str) -> Result<RemoteId, StoreError> {
    RemoteId::new(s)
        .map_err(|e| StoreError::SerializationError(format!("Invalid RemoteId '{}': {}", s, e)))
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a FolderRecord from a database row
fn folder_from_row(row: &SqliteRow) -> Result<FolderRecord, StoreError> {
    let user_id_str: String = row.get("user_id");
    let remote_id_str: String = row.get("remote_id");
    let parent_id_str: Option<String> = row.get("parent_id");
    let updated_at_str: String = row.get("updated_at");

    Ok(FolderRecord {
        user_id: parse_user_id(&user_id_str)?,
        remote_id: parse_remote_id(&remote_id_str)?,
        name: row.get("name"),
        parent_id: parent_id_str.as_deref().map(parse_remote_id).transpose()?,
        cached_path: row.get("cached_path"),
        trashed: row.get::<i64, _>("trashed") != 0,
        updated_at: parse_datetime(&updated_at_str)?,
    })
}

/// Reconstruct a MediaItem from a database row
fn item_from_row(row: &SqliteRow) -> Result<MediaItem, StoreError> {
    let user_id_str: String = row.get("user_id");
    let remote_id_str: String = row.get("remote_id");
    let parents_str: String = row.get("parents");
    let media_str: Option<String> = row.get("media");
    let status_str: String = row.get("status");
    let origin_status_str: String = row.get("origin_status");
    let size: Option<i64> = row.get("size");

    let parents: Vec<RemoteId> = serde_json::from_str(&parents_str)
        .map_err(|e| StoreError::SerializationError(format!("Invalid parents JSON: {}", e)))?;

    let media: Option<MediaMetadata> = match media_str {
        Some(ref s) if !s.is_empty() => Some(serde_json::from_str(s).map_err(|e| {
            StoreError::SerializationError(format!("Invalid media JSON: {}", e))
        })?),
        _ => None,
    };

    Ok(MediaItem {
        user_id: parse_user_id(&user_id_str)?,
        remote_id: parse_remote_id(&remote_id_str)?,
        name: row.get("name"),
        mime_type: row.get("mime_type"),
        size: size.map(|s| s as u64),
        content_hash: row.get("content_hash"),
        created_time: parse_optional_datetime(row.get("created_time"))?,
        modified_time: parse_optional_datetime(row.get("modified_time"))?,
        parents,
        origin_folder_name: row.get("origin_folder_name"),
        media,
        status: item_status_from_string(&status_str)?,
        origin_status: origin_status_from_string(&origin_status_str)?,
        origin_missing_since: parse_optional_datetime(row.get("origin_missing_since"))?,
        last_seen_at: parse_optional_datetime(row.get("last_seen_at"))?,
        last_sync_seen_at: parse_optional_datetime(row.get("last_sync_seen_at"))?,
    })
}

/// Reconstruct a SyncState from a database row
///
/// Uses serde JSON deserialization since the struct has private fields that
/// can only be set through its transition methods or deserialization.
fn sync_state_from_row(row: &SqliteRow) -> Result<SyncState, StoreError> {
    let user_id_str: String = row.get("user_id");
    let root_folder_id: Option<String> = row.get("root_folder_id");
    let pending_folders_str: String = row.get("pending_folders");
    let status: String = row.get("status");
    let last_error: Option<String> = row.get("last_error");
    let change_cursor: Option<String> = row.get("change_cursor");
    let scan_started_at: Option<String> = row.get("scan_started_at");
    let last_full_scan_at: Option<String> = row.get("last_full_scan_at");
    let last_changes_at: Option<String> = row.get("last_changes_at");
    let processed_folders: i64 = row.get("processed_folders");
    let updated_items: i64 = row.get("updated_items");
    let found_folders: i64 = row.get("found_folders");
    let version: i64 = row.get("version");

    let pending_folders: serde_json::Value = serde_json::from_str(&pending_folders_str)
        .map_err(|e| {
            StoreError::SerializationError(format!("Invalid pending_folders JSON: {}", e))
        })?;

    let state_json = serde_json::json!({
        "user_id": user_id_str,
        "root_folder_id": root_folder_id,
        "pending_folders": pending_folders,
        "status": status,
        "last_error": last_error,
        "change_cursor": change_cursor,
        "scan_started_at": parse_optional_datetime(scan_started_at)?
            .map(|d| d.to_rfc3339()),
        "last_full_scan_at": parse_optional_datetime(last_full_scan_at)?
            .map(|d| d.to_rfc3339()),
        "last_changes_at": parse_optional_datetime(last_changes_at)?
            .map(|d| d.to_rfc3339()),
        "stats": {
            "processed_folders": processed_folders as u64,
            "updated_items": updated_items as u64,
            "found_folders": found_folders as u64,
        },
        "version": version,
    });

    serde_json::from_value(state_json).map_err(|e| {
        StoreError::SerializationError(format!("Failed to reconstruct SyncState from row: {}", e))
    })
}

/// Reconstruct a StoredCredential from a database row
fn credential_from_row(row: &SqliteRow) -> Result<StoredCredential, StoreError> {
    let user_id_str: String = row.get("user_id");
    let expires_at_str: String = row.get("expires_at");

    Ok(StoredCredential {
        user_id: parse_user_id(&user_id_str)?,
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        scope: row.get("scope"),
        expires_at: parse_datetime(&expires_at_str)?,
        version: row.get("version"),
    })
}

// ============================================================================
// IMirrorRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IMirrorRepository for SqliteMirrorRepository {
    async fn upsert_folder(&self, folder: &FolderRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO folders (user_id, remote_id, name, parent_id, cached_path, trashed, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, remote_id) DO UPDATE SET
                name = excluded.name,
                parent_id = excluded.parent_id,
                cached_path = excluded.cached_path,
                trashed = excluded.trashed,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(folder.user_id.to_string())
        .bind(folder.remote_id.as_str())
        .bind(&folder.name)
        .bind(folder.parent_id.as_ref().map(|p| p.as_str().to_string()))
        .bind(&folder.cached_path)
        .bind(folder.trashed as i64)
        .bind(datetime_to_string(folder.updated_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn get_folder(
        &self,
        user_id: &UserId,
        remote_id: &RemoteId,
    ) -> Result<Option<FolderRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM folders WHERE user_id = ? AND remote_id = ?")
            .bind(user_id.to_string())
            .bind(remote_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.as_ref().map(folder_from_row).transpose()
    }

    async fn upsert_item(&self, item: &MediaItem) -> Result<(), StoreError> {
        let parents = serde_json::to_string(&item.parents)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let media = item
            .media
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO items (
                user_id, remote_id, name, mime_type, size, content_hash,
                created_time, modified_time, parents, origin_folder_name, media,
                status, origin_status, origin_missing_since, last_seen_at, last_sync_seen_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, remote_id) DO UPDATE SET
                name = excluded.name,
                mime_type = excluded.mime_type,
                size = excluded.size,
                content_hash = excluded.content_hash,
                created_time = excluded.created_time,
                modified_time = excluded.modified_time,
                parents = excluded.parents,
                origin_folder_name = excluded.origin_folder_name,
                media = excluded.media,
                status = excluded.status,
                origin_status = excluded.origin_status,
                origin_missing_since = excluded.origin_missing_since,
                last_seen_at = excluded.last_seen_at,
                last_sync_seen_at = excluded.last_sync_seen_at
            "#,
        )
        .bind(item.user_id.to_string())
        .bind(item.remote_id.as_str())
        .bind(&item.name)
        .bind(&item.mime_type)
        .bind(item.size.map(|s| s as i64))
        .bind(&item.content_hash)
        .bind(optional_datetime_to_string(item.created_time))
        .bind(optional_datetime_to_string(item.modified_time))
        .bind(parents)
        .bind(&item.origin_folder_name)
        .bind(media)
        .bind(item_status_to_string(item.status))
        .bind(origin_status_to_string(item.origin_status))
        .bind(optional_datetime_to_string(item.origin_missing_since))
        .bind(optional_datetime_to_string(item.last_seen_at))
        .bind(optional_datetime_to_string(item.last_sync_seen_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn get_item(
        &self,
        user_id: &UserId,
        remote_id: &RemoteId,
    ) -> Result<Option<MediaItem>, StoreError> {
        let row = sqlx::query("SELECT * FROM items WHERE user_id = ? AND remote_id = ?")
            .bind(user_id.to_string())
            .bind(remote_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn count_items_by_status(
        &self,
        user_id: &UserId,
    ) -> Result<HashMap<String, u64>, StoreError> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM items WHERE user_id = ? GROUP BY status",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        let mut counts = HashMap::new();
        for row in rows {
            let status: String = row.get("status");
            let count: i64 = row.get("count");
            counts.insert(status, count as u64);
        }
        Ok(counts)
    }

    async fn mark_unseen_items_missing(
        &self,
        user_id: &UserId,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        // RFC 3339 strings with a fixed offset compare chronologically, so
        // the cutoff comparison happens directly in SQL.
        let result = sqlx::query(
            r#"
            UPDATE items SET
                status = 'missing',
                origin_status = 'missing',
                origin_missing_since = ?,
                origin_folder_name = NULL
            WHERE user_id = ?
              AND origin_status = 'active'
              AND status != 'deleted'
              AND (last_sync_seen_at IS NULL OR last_sync_seen_at < ?)
            "#,
        )
        .bind(datetime_to_string(now))
        .bind(user_id.to_string())
        .bind(datetime_to_string(cutoff))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn get_sync_state(&self, user_id: &UserId) -> Result<Option<SyncState>, StoreError> {
        let row = sqlx::query("SELECT * FROM sync_state WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.as_ref().map(sync_state_from_row).transpose()
    }

    async fn save_sync_state(&self, state: &SyncState) -> Result<i64, StoreError> {
        let pending = serde_json::to_string(state.pending_folders())
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let stats = state.stats();
        let new_version = state.version() + 1;

        if state.version() == 0 {
            // First write for this user; refuse to clobber a row that
            // appeared concurrently.
            let result = sqlx::query(
                r#"
                INSERT INTO sync_state (
                    user_id, root_folder_id, pending_folders, status, last_error,
                    change_cursor, scan_started_at, last_full_scan_at, last_changes_at,
                    processed_folders, updated_items, found_folders, version
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT (user_id) DO NOTHING
                "#,
            )
            .bind(state.user_id().to_string())
            .bind(state.root_folder_id().map(|r| r.as_str().to_string()))
            .bind(pending)
            .bind(state.status().to_string())
            .bind(state.last_error())
            .bind(state.change_cursor().map(|c| c.as_str().to_string()))
            .bind(optional_datetime_to_string(state.scan_started_at()))
            .bind(optional_datetime_to_string(state.last_full_scan_at()))
            .bind(optional_datetime_to_string(state.last_changes_at()))
            .bind(stats.processed_folders as i64)
            .bind(stats.updated_items as i64)
            .bind(stats.found_folders as i64)
            .bind(new_version)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

            if result.rows_affected() == 1 {
                return Ok(new_version);
            }
            return Err(StoreError::Conflict(format!(
                "sync state for user {} was created concurrently",
                state.user_id()
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE sync_state SET
                root_folder_id = ?,
                pending_folders = ?,
                status = ?,
                last_error = ?,
                change_cursor = ?,
                scan_started_at = ?,
                last_full_scan_at = ?,
                last_changes_at = ?,
                processed_folders = ?,
                updated_items = ?,
                found_folders = ?,
                version = ?
            WHERE user_id = ? AND version = ?
            "#,
        )
        .bind(state.root_folder_id().map(|r| r.as_str().to_string()))
        .bind(pending)
        .bind(state.status().to_string())
        .bind(state.last_error())
        .bind(state.change_cursor().map(|c| c.as_str().to_string()))
        .bind(optional_datetime_to_string(state.scan_started_at()))
        .bind(optional_datetime_to_string(state.last_full_scan_at()))
        .bind(optional_datetime_to_string(state.last_changes_at()))
        .bind(stats.processed_folders as i64)
        .bind(stats.updated_items as i64)
        .bind(stats.found_folders as i64)
        .bind(new_version)
        .bind(state.user_id().to_string())
        .bind(state.version())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        if result.rows_affected() == 1 {
            Ok(new_version)
        } else {
            Err(StoreError::Conflict(format!(
                "sync state for user {} moved past version {}",
                state.user_id(),
                state.version()
            )))
        }
    }

    async fn get_sync_settings(
        &self,
        user_id: &UserId,
    ) -> Result<Option<SyncSettings>, StoreError> {
        let row = sqlx::query("SELECT * FROM sync_settings WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.map(|row| {
            let user_id_str: String = row.get("user_id");
            let folder_id_str: String = row.get("drive_folder_id");
            Ok(SyncSettings {
                user_id: parse_user_id(&user_id_str)?,
                drive_folder_id: parse_remote_id(&folder_id_str)?,
                folder_name: row.get("folder_name"),
                folder_path: row.get("folder_path"),
            })
        })
        .transpose()
    }

    async fn save_sync_settings(&self, settings: &SyncSettings) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sync_settings (user_id, drive_folder_id, folder_name, folder_path)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (user_id) DO UPDATE SET
                drive_folder_id = excluded.drive_folder_id,
                folder_name = excluded.folder_name,
                folder_path = excluded.folder_path
            "#,
        )
        .bind(settings.user_id.to_string())
        .bind(settings.drive_folder_id.as_str())
        .bind(&settings.folder_name)
        .bind(&settings.folder_path)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

// ============================================================================
// ICredentialStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ICredentialStore for SqliteMirrorRepository {
    async fn get_credential(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredCredential>, StoreError> {
        let row = sqlx::query("SELECT * FROM credentials WHERE user_id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn put_credential(&self, credential: &StoredCredential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO credentials (user_id, access_token, refresh_token, scope, expires_at, version)
            VALUES (?, ?, ?, ?, ?, 1)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                scope = excluded.scope,
                expires_at = excluded.expires_at,
                version = 1
            "#,
        )
        .bind(credential.user_id.to_string())
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(&credential.scope)
        .bind(datetime_to_string(credential.expires_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }

    async fn compare_and_swap_credential(
        &self,
        credential: &StoredCredential,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE credentials SET
                access_token = ?,
                refresh_token = ?,
                scope = ?,
                expires_at = ?,
                version = ?
            WHERE user_id = ? AND version = ?
            "#,
        )
        .bind(&credential.access_token)
        .bind(&credential.refresh_token)
        .bind(&credential.scope)
        .bind(datetime_to_string(credential.expires_at))
        .bind(expected_version + 1)
        .bind(credential.user_id.to_string())
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_credential(&self, user_id: &UserId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}
