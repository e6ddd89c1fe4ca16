//! Integration tests for children listing
//!
//! Verifies end-to-end behavior of `files::list_children` against a
//! wiremock-based Drive API mock:
//! - Single-page listings with mixed folders and files
//! - Pagination until the folder is exhausted
//! - Empty folders
//! - Media metadata mapping

use photosort_core::domain::item::MediaKind;
use photosort_core::domain::newtypes::RemoteId;
use photosort_drive::files;

use crate::common;

fn rid(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

#[tokio::test]
async fn test_list_children_mixed_types() {
    let (server, client) = common::setup_drive_mock().await;

    let video = {
        let mut video = common::image_file("file-v", "clip.mp4", "root-1");
        video["mimeType"] = serde_json::json!("video/mp4");
        video["videoMediaMetadata"] = serde_json::json!({
            "width": 1920, "height": 1080, "durationMillis": "12000"
        });
        video
    };
    common::mount_children_single_page(
        &server,
        serde_json::json!([
            common::folder_file("folder-a", "Iceland", "root-1"),
            common::image_file("file-x", "x.jpg", "root-1"),
            video
        ]),
    )
    .await;

    let children = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect("children listing failed");

    assert_eq!(children.len(), 3);

    let folder = &children[0];
    assert!(folder.is_folder);
    assert_eq!(folder.name, "Iceland");
    assert_eq!(folder.parents, vec![rid("root-1")]);

    let image = &children[1];
    assert!(!image.is_folder);
    assert_eq!(image.size, Some(1024));
    assert!(image.content_hash.is_some());

    let video = &children[2];
    let media = video.media.as_ref().unwrap();
    assert_eq!(media.kind, MediaKind::Video);
    assert_eq!(media.duration_ms, Some(12000));
}

#[tokio::test]
async fn test_list_children_follows_pagination() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_children_paginated(
        &server,
        serde_json::json!([
            common::image_file("file-1", "a.jpg", "root-1"),
            common::image_file("file-2", "b.jpg", "root-1")
        ]),
        serde_json::json!([common::image_file("file-3", "c.jpg", "root-1")]),
    )
    .await;

    let children = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect("paginated listing failed");

    assert_eq!(children.len(), 3);
    let ids: Vec<&str> = children.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["file-1", "file-2", "file-3"]);
}

#[tokio::test]
async fn test_list_children_empty_folder() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_children_single_page(&server, serde_json::json!([])).await;

    let children = files::list_children(&client, "test-token", &rid("empty-folder"))
        .await
        .expect("empty listing failed");

    assert!(children.is_empty());
}

#[tokio::test]
async fn test_provider_port_roundtrip() {
    use photosort_core::ports::IDriveProvider;
    use photosort_drive::GoogleDriveProvider;

    let (server, client) = common::setup_drive_mock().await;
    common::mount_children_single_page(
        &server,
        serde_json::json!([common::image_file("file-1", "a.jpg", "root-1")]),
    )
    .await;
    common::mount_start_page_token(&server, "9000").await;

    let provider: &dyn IDriveProvider = &GoogleDriveProvider::with_client(client);

    let children = provider
        .list_children("test-token", &rid("root-1"))
        .await
        .unwrap();
    assert_eq!(children.len(), 1);

    let cursor = provider.start_cursor("test-token").await.unwrap();
    assert_eq!(cursor.as_str(), "9000");
}

#[tokio::test]
async fn test_list_children_photo_metadata() {
    let (server, client) = common::setup_drive_mock().await;

    common::mount_children_single_page(
        &server,
        serde_json::json!([{
            "id": "photo-1",
            "name": "sunset.jpg",
            "mimeType": "image/jpeg",
            "size": "2048",
            "parents": ["root-1"],
            "imageMediaMetadata": {
                "width": 4032,
                "height": 3024,
                "time": "2025:08:01 19:30:00"
            }
        }]),
    )
    .await;

    let children = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .unwrap();

    let media = children[0].media.as_ref().unwrap();
    assert_eq!(media.kind, MediaKind::Photo);
    assert_eq!(media.width, Some(4032));
    assert_eq!(media.height, Some(3024));
    assert_eq!(
        media.captured_at.unwrap().to_rfc3339(),
        "2025-08-01T19:30:00+00:00"
    );
}
