//! GoogleDriveProvider - IDriveProvider implementation
//!
//! Thin adapter that fulfils the [`IDriveProvider`] port contract by
//! delegating to the [`files`](crate::files) and [`changes`](crate::changes)
//! modules over one shared [`DriveClient`].

use photosort_core::domain::newtypes::{PageCursor, RemoteId};
use photosort_core::ports::{ChangesPage, IDriveProvider, ProviderError, RemoteChild};

use crate::changes;
use crate::client::DriveClient;
use crate::files;

/// Drive API implementation of the provider port
///
/// Stateless apart from the HTTP client; one instance serves all users,
/// with the access token supplied per call.
pub struct GoogleDriveProvider {
    client: DriveClient,
}

impl GoogleDriveProvider {
    /// Creates a provider against the production Drive API
    pub fn new() -> Self {
        Self {
            client: DriveClient::new(),
        }
    }

    /// Creates a provider around an existing client (useful for testing)
    pub fn with_client(client: DriveClient) -> Self {
        Self { client }
    }

    /// Returns the underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

impl Default for GoogleDriveProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IDriveProvider for GoogleDriveProvider {
    async fn list_children(
        &self,
        access_token: &str,
        folder_id: &RemoteId,
    ) -> Result<Vec<RemoteChild>, ProviderError> {
        files::list_children(&self.client, access_token, folder_id).await
    }

    async fn start_cursor(&self, access_token: &str) -> Result<PageCursor, ProviderError> {
        changes::start_cursor(&self.client, access_token).await
    }

    async fn changes_page(
        &self,
        access_token: &str,
        cursor: &PageCursor,
    ) -> Result<ChangesPage, ProviderError> {
        changes::changes_page(&self.client, access_token, cursor).await
    }
}
