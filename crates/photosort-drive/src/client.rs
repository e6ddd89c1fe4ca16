//! Google Drive API HTTP client
//!
//! Wraps `reqwest::Client` with bearer authentication, base-URL construction
//! and exponential-backoff retry for transient failures. The access token is
//! passed per call because one client instance serves every user of the
//! application.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use photosort_core::ports::ProviderError;

/// Base URL for the Google Drive v3 API
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Maximum retry attempts for transient failures
const DEFAULT_MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Backoff multiplier per attempt
const BACKOFF_FACTOR: u32 = 2;

// ============================================================================
// Error body parsing
// ============================================================================

/// Error envelope returned by the Drive API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

/// Error details inside the envelope
#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

/// One error item with a machine-readable reason
#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    reason: Option<String>,
}

/// Machine-readable reason and message extracted from an error response body
#[derive(Debug, Default)]
struct ErrorDetails {
    reason: String,
    message: String,
}

async fn read_error_details(response: Response) -> ErrorDetails {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => {
            let error = body.error;
            let reason = error
                .as_ref()
                .and_then(|e| e.errors.first())
                .and_then(|e| e.reason.clone())
                .unwrap_or_default();
            let message = error.and_then(|e| e.message).unwrap_or(text);
            ErrorDetails { reason, message }
        }
        Err(_) => ErrorDetails {
            reason: String::new(),
            message: text,
        },
    }
}

/// 403 reasons the Drive API uses for rate limiting
fn is_rate_limit_reason(reason: &str) -> bool {
    matches!(
        reason,
        "userRateLimitExceeded" | "rateLimitExceeded" | "dailyLimitExceeded"
    )
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Every request goes through [`execute_with_backoff`](DriveClient::execute_with_backoff),
/// which absorbs transient failures (429, rate-limited 403, 5xx, network
/// errors) with `base * factor^attempt` delays and maps everything else to
/// the [`ProviderError`] taxonomy.
pub struct DriveClient {
    /// The underlying HTTP client
    http: Client,
    /// Base URL for API requests
    base_url: String,
    /// Retry ceiling for transient failures
    max_retries: u32,
    /// Base delay for exponential backoff
    backoff_base: Duration,
}

impl DriveClient {
    /// Creates a client against the production Drive API
    pub fn new() -> Self {
        Self {
            http: Client::new(),
            base_url: DRIVE_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }

    /// Creates a client from the application configuration
    pub fn from_config(config: &photosort_core::config::DriveConfig) -> Self {
        Self::with_base_url(config.api_base.clone())
    }

    /// Overrides the retry ceiling and backoff base (useful for testing)
    pub fn with_backoff(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.max_retries = max_retries;
        self.backoff_base = backoff_base;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Prepends the base URL and adds the Authorization header.
    pub fn request(&self, method: Method, path: &str, access_token: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.http.request(method, &url).bearer_auth(access_token)
    }

    /// Executes a GET request with query parameters and backoff retry
    ///
    /// `query` is re-applied on every attempt; the response is returned on
    /// the first non-transient outcome.
    pub async fn get_with_backoff(
        &self,
        path: &str,
        access_token: &str,
        query: &[(&str, &str)],
        what: &str,
    ) -> Result<Response, ProviderError> {
        self.execute_with_backoff(
            || self.request(Method::GET, path, access_token).query(query),
            what,
        )
        .await
    }

    /// Executes a request with exponential backoff on transient failures
    ///
    /// Classification:
    /// - 2xx: returned to the caller
    /// - 429, 5xx, rate-limited 403, network errors: retried up to the
    ///   ceiling, then [`ProviderError::Unavailable`]
    /// - 401: [`ProviderError::Unauthorized`]
    /// - 403 `insufficientPermissions`: [`ProviderError::InsufficientScope`]
    /// - 404: [`ProviderError::NotFound`]
    /// - 410: [`ProviderError::CursorInvalid`] (expired change cursor)
    /// - other 4xx: [`ProviderError::InvalidResponse`], no retry
    pub async fn execute_with_backoff<F>(
        &self,
        build: F,
        what: &str,
    ) -> Result<Response, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut last_transient = String::new();

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * BACKOFF_FACTOR.pow(attempt - 1);
                warn!(
                    what,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %last_transient,
                    "Transient provider error, backing off"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match build().send().await {
                Ok(response) => response,
                Err(e) => {
                    last_transient = format!("network error: {e}");
                    continue;
                }
            };

            let status = response.status();

            if status.is_success() {
                if attempt > 0 {
                    info!(what, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                last_transient = format!("HTTP {status}");
                continue;
            }

            let details = read_error_details(response).await;
            debug!(
                what,
                status = status.as_u16(),
                reason = %details.reason,
                "Provider returned error status"
            );

            return Err(match status {
                StatusCode::UNAUTHORIZED => ProviderError::Unauthorized(details.message),
                StatusCode::FORBIDDEN => {
                    if is_rate_limit_reason(&details.reason) {
                        last_transient = format!("rate limited ({})", details.reason);
                        continue;
                    }
                    ProviderError::InsufficientScope(details.message)
                }
                StatusCode::NOT_FOUND => ProviderError::NotFound(details.message),
                StatusCode::GONE => ProviderError::CursorInvalid(details.message),
                _ => ProviderError::InvalidResponse(format!(
                    "HTTP {status} for {what}: {}",
                    details.message
                )),
            });
        }

        Err(ProviderError::Unavailable(format!(
            "{what}: retry limit exhausted after {} attempts ({last_transient})",
            self.max_retries + 1
        )))
    }
}

impl Default for DriveClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_defaults() {
        let client = DriveClient::new();
        assert_eq!(client.base_url(), DRIVE_BASE_URL);
        assert_eq!(client.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_from_config_uses_configured_base() {
        let config = photosort_core::config::DriveConfig {
            api_base: "http://localhost:4321/drive/v3".to_string(),
            ..Default::default()
        };
        let client = DriveClient::from_config(&config);
        assert_eq!(client.base_url(), "http://localhost:4321/drive/v3");
    }

    #[test]
    fn test_custom_base_url() {
        let client = DriveClient::with_base_url("http://localhost:8080");
        let request = client
            .request(Method::GET, "/files", "tok")
            .build()
            .unwrap();
        assert_eq!(request.url().as_str(), "http://localhost:8080/files");
    }

    #[test]
    fn test_request_carries_bearer_token() {
        let client = DriveClient::with_base_url("http://localhost");
        let request = client
            .request(Method::GET, "/files", "secret-token")
            .build()
            .unwrap();
        let auth = request
            .headers()
            .get("authorization")
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(auth, "Bearer secret-token");
    }

    #[test]
    fn test_rate_limit_reasons() {
        assert!(is_rate_limit_reason("userRateLimitExceeded"));
        assert!(is_rate_limit_reason("rateLimitExceeded"));
        assert!(!is_rate_limit_reason("insufficientPermissions"));
        assert!(!is_rate_limit_reason(""));
    }

    #[test]
    fn test_error_body_parsing() {
        let json = r#"{
            "error": {
                "code": 403,
                "message": "The user does not have sufficient permissions",
                "errors": [
                    { "domain": "global", "reason": "insufficientPermissions" }
                ]
            }
        }"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        let error = body.error.unwrap();
        assert_eq!(
            error.errors[0].reason.as_deref(),
            Some("insufficientPermissions")
        );
        assert!(error.message.unwrap().contains("sufficient permissions"));
    }

    #[test]
    fn test_error_body_without_items() {
        let json = r#"{"error": {"code": 401, "message": "Invalid Credentials"}}"#;
        let body: ApiErrorBody = serde_json::from_str(json).unwrap();
        assert!(body.error.unwrap().errors.is_empty());
    }
}
