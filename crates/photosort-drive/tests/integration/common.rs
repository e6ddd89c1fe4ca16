//! Shared test helpers for Drive API integration tests
//!
//! Provides wiremock-based mock server setup. Each helper mounts the
//! necessary mock endpoints and returns a configured client pointing at the
//! mock server. Backoff is tightened so retry tests stay fast.

use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use photosort_drive::client::DriveClient;

/// Starts a mock server and returns it with a client using millisecond backoff.
pub async fn setup_drive_mock() -> (MockServer, DriveClient) {
    let server = MockServer::start().await;
    let client =
        DriveClient::with_base_url(server.uri()).with_backoff(3, Duration::from_millis(5));
    (server, client)
}

/// Mounts a files.list endpoint returning a single page with the given files.
pub async fn mount_children_single_page(server: &MockServer, files: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": files
        })))
        .mount(server)
        .await;
}

/// Mounts a files.list endpoint returning two pages (pagination test).
///
/// The first request (no pageToken) returns page 1 with a nextPageToken;
/// the second request, carrying that token, returns page 2.
pub async fn mount_children_paginated(
    server: &MockServer,
    page1_files: serde_json::Value,
    page2_files: serde_json::Value,
) {
    Mock::given(method("GET"))
        .and(path("/files"))
        .and(query_param("pageToken", "children-page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page2_files
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": page1_files,
            "nextPageToken": "children-page-2"
        })))
        .mount(server)
        .await;
}

/// Mounts the startPageToken endpoint.
pub async fn mount_start_page_token(server: &MockServer, token: &str) {
    Mock::given(method("GET"))
        .and(path("/changes/startPageToken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "startPageToken": token
        })))
        .mount(server)
        .await;
}

/// Mounts a changes.list endpoint for one specific pageToken value.
pub async fn mount_changes_page(server: &MockServer, page_token: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/changes"))
        .and(query_param("pageToken", page_token))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Builds a minimal image file resource for listing bodies.
pub fn image_file(id: &str, name: &str, parent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "mimeType": "image/jpeg",
        "size": "1024",
        "md5Checksum": "0123456789abcdef0123456789abcdef",
        "modifiedTime": "2026-01-15T10:00:00.000Z",
        "parents": [parent],
        "trashed": false
    })
}

/// Builds a folder resource for listing bodies.
pub fn folder_file(id: &str, name: &str, parent: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "mimeType": "application/vnd.google-apps.folder",
        "parents": [parent]
    })
}
