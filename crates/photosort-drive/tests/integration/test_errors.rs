//! Integration tests for error classification and backoff
//!
//! Verifies that the client retries transient failures with backoff and maps
//! non-transient statuses onto the provider error taxonomy.

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use photosort_core::domain::newtypes::{PageCursor, RemoteId};
use photosort_core::ports::ProviderError;
use photosort_drive::{changes, files};

use crate::common;

fn rid(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

#[tokio::test]
async fn test_retries_429_then_succeeds() {
    let (server, client) = common::setup_drive_mock().await;

    // First two attempts are throttled, the third succeeds
    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": [common::image_file("file-1", "a.jpg", "root-1")]
        })))
        .mount(&server)
        .await;

    let children = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect("retry should recover from 429");

    assert_eq!(children.len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_surface_unavailable() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect_err("permanent 503 should exhaust retries");

    assert!(matches!(err, ProviderError::Unavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_401_maps_to_unauthorized() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": { "code": 401, "message": "Invalid Credentials" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect_err("401 should fail immediately");

    assert!(matches!(err, ProviderError::Unauthorized(_)), "got {err:?}");
}

#[tokio::test]
async fn test_403_insufficient_permissions_maps_to_scope_error() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "The user does not have sufficient permissions",
                "errors": [{ "domain": "global", "reason": "insufficientPermissions" }]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect_err("scope failure should not be retried");

    assert!(
        matches!(err, ProviderError::InsufficientScope(_)),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_403_rate_limit_is_retried() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "error": {
                "code": 403,
                "message": "User rate limit exceeded",
                "errors": [{ "domain": "usageLimits", "reason": "userRateLimitExceeded" }]
            }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "files": []
        })))
        .mount(&server)
        .await;

    let children = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect("rate-limited 403 should be retried");

    assert!(children.is_empty());
}

#[tokio::test]
async fn test_410_on_changes_maps_to_cursor_invalid() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/changes"))
        .respond_with(ResponseTemplate::new(410).set_body_json(serde_json::json!({
            "error": { "code": 410, "message": "Page token expired" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = changes::changes_page(
        &client,
        "test-token",
        &PageCursor::new("ancient-cursor").unwrap(),
    )
    .await
    .expect_err("410 should surface as CursorInvalid");

    assert!(matches!(err, ProviderError::CursorInvalid(_)), "got {err:?}");
}

#[tokio::test]
async fn test_404_maps_to_not_found() {
    let (server, client) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": { "code": 404, "message": "File not found: no-such-folder" }
        })))
        .mount(&server)
        .await;

    let err = files::list_children(&client, "test-token", &rid("no-such-folder"))
        .await
        .expect_err("404 should fail immediately");

    assert!(matches!(err, ProviderError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_network_error_retries_then_unavailable() {
    // Point at a closed port; every attempt is a connection error
    let client = photosort_drive::client::DriveClient::with_base_url("http://127.0.0.1:1")
        .with_backoff(1, std::time::Duration::from_millis(1));

    let err = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect_err("unreachable host should surface Unavailable");

    assert!(matches!(err, ProviderError::Unavailable(_)), "got {err:?}");
}

#[tokio::test]
async fn test_non_retryable_400_fails_fast() {
    let server = MockServer::start().await;
    let client = photosort_drive::client::DriveClient::with_base_url(server.uri())
        .with_backoff(3, std::time::Duration::from_millis(5));

    Mock::given(method("GET"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 400, "message": "Invalid query" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = files::list_children(&client, "test-token", &rid("root-1"))
        .await
        .expect_err("400 should not be retried");

    assert!(
        matches!(err, ProviderError::InvalidResponse(_)),
        "got {err:?}"
    );
}
