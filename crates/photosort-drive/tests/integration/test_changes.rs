//! Integration tests for the change feed
//!
//! Verifies cursor fetch, page-by-page change consumption, and the cursor
//! handoff on the last page.

use photosort_core::domain::newtypes::PageCursor;
use photosort_drive::changes;

use crate::common;

fn cursor(s: &str) -> PageCursor {
    PageCursor::new(s).unwrap()
}

#[tokio::test]
async fn test_start_cursor() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_start_page_token(&server, "18231").await;

    let cursor = changes::start_cursor(&client, "test-token")
        .await
        .expect("start cursor fetch failed");

    assert_eq!(cursor.as_str(), "18231");
}

#[tokio::test]
async fn test_changes_single_page_with_new_cursor() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_changes_page(
        &server,
        "18231",
        serde_json::json!({
            "changes": [
                {
                    "changeType": "file",
                    "fileId": "file-1",
                    "removed": false,
                    "file": common::image_file("file-1", "new.jpg", "root-1")
                },
                {
                    "changeType": "file",
                    "fileId": "file-2",
                    "removed": true
                }
            ],
            "newStartPageToken": "18300"
        }),
    )
    .await;

    let page = changes::changes_page(&client, "test-token", &cursor("18231"))
        .await
        .expect("changes page failed");

    assert_eq!(page.changes.len(), 2);
    assert!(page.next_page.is_none());
    assert_eq!(page.new_start_cursor, Some(cursor("18300")));

    assert!(!page.changes[0].removed);
    assert_eq!(page.changes[0].child.as_ref().unwrap().name, "new.jpg");

    assert!(page.changes[1].removed);
    assert!(page.changes[1].child.is_none());
}

#[tokio::test]
async fn test_changes_pagination_chain() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_changes_page(
        &server,
        "start",
        serde_json::json!({
            "changes": [{
                "changeType": "file",
                "fileId": "file-1",
                "removed": false,
                "file": common::image_file("file-1", "a.jpg", "root-1")
            }],
            "nextPageToken": "middle"
        }),
    )
    .await;

    common::mount_changes_page(
        &server,
        "middle",
        serde_json::json!({
            "changes": [{
                "changeType": "file",
                "fileId": "file-2",
                "removed": false,
                "file": common::image_file("file-2", "b.jpg", "root-1")
            }],
            "newStartPageToken": "fresh"
        }),
    )
    .await;

    // First page carries a continuation, no fresh cursor yet
    let first = changes::changes_page(&client, "test-token", &cursor("start"))
        .await
        .unwrap();
    assert_eq!(first.changes.len(), 1);
    assert_eq!(first.next_page, Some(cursor("middle")));
    assert!(first.new_start_cursor.is_none());

    // Following the continuation reaches the fresh cursor
    let second = changes::changes_page(&client, "test-token", &first.next_page.unwrap())
        .await
        .unwrap();
    assert_eq!(second.changes.len(), 1);
    assert!(second.next_page.is_none());
    assert_eq!(second.new_start_cursor, Some(cursor("fresh")));
}

#[tokio::test]
async fn test_changes_empty_feed() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_changes_page(
        &server,
        "quiet",
        serde_json::json!({
            "changes": [],
            "newStartPageToken": "quiet-2"
        }),
    )
    .await;

    let page = changes::changes_page(&client, "test-token", &cursor("quiet"))
        .await
        .unwrap();

    assert!(page.changes.is_empty());
    assert_eq!(page.new_start_cursor, Some(cursor("quiet-2")));
}

#[tokio::test]
async fn test_changes_skips_drive_scope_entries() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_changes_page(
        &server,
        "mixed",
        serde_json::json!({
            "changes": [
                { "changeType": "drive", "driveId": "d-1" },
                {
                    "changeType": "file",
                    "fileId": "file-1",
                    "removed": false,
                    "file": common::image_file("file-1", "kept.jpg", "root-1")
                }
            ],
            "newStartPageToken": "after-mixed"
        }),
    )
    .await;

    let page = changes::changes_page(&client, "test-token", &cursor("mixed"))
        .await
        .unwrap();

    assert_eq!(page.changes.len(), 1);
    assert_eq!(page.changes[0].file_id.as_str(), "file-1");
}
