//! Refresh-token exchange against the provider token endpoint
//!
//! Wraps the `oauth2` crate's refresh-token grant. The taxonomy mapping is
//! the part callers depend on: `invalid_grant` means the refresh token was
//! revoked or expired and the user must re-authorize; transport failures are
//! transient and retryable.

use chrono::{Duration, Utc};
use oauth2::basic::{BasicClient, BasicErrorResponseType};
use oauth2::{ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};
use tracing::{info, warn};

use photosort_core::ports::CredentialError;

/// Result of one refresh-token exchange
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    /// Fresh plaintext access token
    pub access_token: String,
    /// New refresh token, when the provider rotated it
    ///
    /// Providers may omit this on subsequent grants; the caller must then
    /// keep using the previous refresh token.
    pub refresh_token: Option<String>,
    /// When the fresh access token expires
    pub expires_at: chrono::DateTime<Utc>,
    /// Scope string granted with the fresh token, when reported
    pub scope: Option<String>,
}

/// Port-style trait for the token endpoint, mockable in tests
#[async_trait::async_trait]
pub trait ITokenRefresher: Send + Sync {
    /// Exchanges a refresh token for a fresh access token
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, CredentialError>;
}

/// Token refresher backed by the `oauth2` crate
pub struct OAuthTokenRefresher {
    token_endpoint: String,
    client_id: String,
    client_secret: Option<String>,
}

impl OAuthTokenRefresher {
    /// Creates a refresher for the given token endpoint and client credentials
    pub fn new(
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
    ) -> Self {
        Self {
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    /// Creates a refresher from the application configuration
    pub fn from_config(config: &photosort_core::config::DriveConfig) -> Self {
        Self::new(
            config.token_endpoint.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        )
    }
}

#[async_trait::async_trait]
impl ITokenRefresher for OAuthTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, CredentialError> {
        info!("Refreshing access token");

        let token_url = TokenUrl::new(self.token_endpoint.clone())
            .map_err(|e| CredentialError::ProviderUnavailable(format!("invalid token URL: {e}")))?;

        let mut client =
            BasicClient::new(ClientId::new(self.client_id.clone())).set_token_uri(token_url);
        if let Some(secret) = &self.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        let http_client = reqwest::Client::new();
        let token_result = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .map_err(|e| match &e {
                RequestTokenError::ServerResponse(response) => {
                    let description = response
                        .error_description()
                        .map(|d| d.to_string())
                        .unwrap_or_else(|| response.error().to_string());
                    match response.error() {
                        BasicErrorResponseType::InvalidGrant => {
                            warn!(error = %description, "Refresh token rejected by provider");
                            CredentialError::NeedsReconsent(description)
                        }
                        BasicErrorResponseType::InvalidScope => {
                            CredentialError::InsufficientScope(description)
                        }
                        _ => CredentialError::ProviderUnavailable(description),
                    }
                }
                _ => CredentialError::ProviderUnavailable(e.to_string()),
            })?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let scope = token_result.scopes().map(|scopes| {
            scopes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        });

        let tokens = RefreshedTokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
            scope,
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresher_construction() {
        let refresher = OAuthTokenRefresher::new(
            "https://oauth2.googleapis.com/token",
            "client-id",
            Some("client-secret".to_string()),
        );
        assert_eq!(refresher.client_id, "client-id");
        assert!(refresher.client_secret.is_some());
    }

    #[test]
    fn test_refresher_from_config() {
        let config = photosort_core::config::DriveConfig {
            client_id: "configured-client".to_string(),
            ..Default::default()
        };
        let refresher = OAuthTokenRefresher::from_config(&config);
        assert_eq!(refresher.client_id, "configured-client");
        assert!(refresher.token_endpoint.contains("googleapis.com"));
        assert!(refresher.client_secret.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transient() {
        let refresher = OAuthTokenRefresher::new("http://127.0.0.1:1/token", "client-id", None);
        let err = refresher.refresh("rt").await.unwrap_err();
        assert!(
            matches!(err, CredentialError::ProviderUnavailable(_)),
            "got {err:?}"
        );
    }
}
