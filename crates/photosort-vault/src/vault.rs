//! Credential vault
//!
//! The [`CredentialVault`] is the only component that sees plaintext OAuth
//! tokens. It loads sealed rows from the credential store, refreshes access
//! tokens shortly before expiry, and guards the refresh against concurrent
//! callers:
//!
//! - In-process, a per-user async mutex serializes the refresh decision;
//!   after acquiring it the row is re-read, so a caller that lost the race
//!   uses the token its peer just stored.
//! - Across processes, the store's compare-and-swap on the row version
//!   decides the winner; the loser re-reads instead of overwriting.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use photosort_core::domain::newtypes::UserId;
use photosort_core::domain::StoredCredential;
use photosort_core::ports::{CredentialError, IAccessTokenSource, ICredentialStore};

use crate::refresh::ITokenRefresher;
use crate::sealer::Sealer;

/// Refresh the access token when it expires within this margin
const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;

/// Vault over sealed per-user OAuth credentials
pub struct CredentialVault {
    store: Arc<dyn ICredentialStore>,
    sealer: Arc<dyn Sealer>,
    refresher: Arc<dyn ITokenRefresher>,
    refresh_margin: Duration,
    /// Per-user refresh locks; one refresh in flight per user
    refresh_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl CredentialVault {
    /// Creates a vault with the default 5-minute refresh margin
    pub fn new(
        store: Arc<dyn ICredentialStore>,
        sealer: Arc<dyn Sealer>,
        refresher: Arc<dyn ITokenRefresher>,
    ) -> Self {
        Self {
            store,
            sealer,
            refresher,
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
            refresh_locks: DashMap::new(),
        }
    }

    /// Overrides the refresh margin (useful for testing)
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Applies the configured refresh margin
    pub fn with_config(self, config: &photosort_core::config::SyncConfig) -> Self {
        self.with_refresh_margin(Duration::seconds(config.token_refresh_margin_secs as i64))
    }

    /// Stores a freshly authorized token pair for a user
    ///
    /// Called by the account-connection flow after the authorization-code
    /// exchange (which itself is outside the engine). Replaces any previous
    /// credential unconditionally.
    pub async fn store_initial(
        &self,
        user_id: UserId,
        access_token: &str,
        refresh_token: Option<&str>,
        scope: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<(), CredentialError> {
        let credential = StoredCredential {
            user_id,
            access_token: self.seal(access_token)?,
            refresh_token: refresh_token.map(|t| self.seal(t)).transpose()?,
            scope: scope.to_string(),
            expires_at,
            version: 0,
        };
        self.store.put_credential(&credential).await?;
        info!(user = %user_id, "Stored initial credential");
        Ok(())
    }

    /// Removes a user's credential (account disconnection)
    pub async fn forget(&self, user_id: &UserId) -> Result<(), CredentialError> {
        self.store.delete_credential(user_id).await?;
        self.refresh_locks.remove(user_id);
        info!(user = %user_id, "Forgot credential");
        Ok(())
    }

    fn seal(&self, plaintext: &str) -> Result<Vec<u8>, CredentialError> {
        self.sealer
            .seal(plaintext.as_bytes())
            .map_err(|e| CredentialError::Sealing(e.to_string()))
    }

    fn unseal(&self, sealed: &[u8]) -> Result<String, CredentialError> {
        let bytes = self
            .sealer
            .open(sealed)
            .map_err(|e| CredentialError::Sealing(e.to_string()))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| CredentialError::Sealing(format!("token is not valid UTF-8: {e}")))
    }

    fn lock_for(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(*user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Refreshes the credential while holding the per-user lock
    ///
    /// `credential` is the row as re-read under the lock.
    async fn refresh_locked(
        &self,
        user_id: &UserId,
        credential: StoredCredential,
    ) -> Result<String, CredentialError> {
        let Some(sealed_refresh) = credential.refresh_token.as_deref() else {
            return Err(CredentialError::NeedsReconsent(
                "no refresh token stored; offline access was never granted".to_string(),
            ));
        };
        let refresh_token = self.unseal(sealed_refresh)?;

        let refreshed = self.refresher.refresh(&refresh_token).await?;

        // Providers may omit the refresh token on subsequent grants; losing
        // it would be unrecoverable, so the previous one is kept.
        let sealed_refresh_token = match refreshed.refresh_token.as_deref() {
            Some(rotated) => Some(self.seal(rotated)?),
            None => credential.refresh_token.clone(),
        };

        let updated = StoredCredential {
            user_id: *user_id,
            access_token: self.seal(&refreshed.access_token)?,
            refresh_token: sealed_refresh_token,
            scope: refreshed.scope.unwrap_or_else(|| credential.scope.clone()),
            expires_at: refreshed.expires_at,
            version: credential.version,
        };

        let swapped = self
            .store
            .compare_and_swap_credential(&updated, credential.version)
            .await?;

        if !swapped {
            // A writer in another process won the race; use what it stored.
            warn!(user = %user_id, "Credential refresh lost compare-and-swap, re-reading");
            let current = self
                .store
                .get_credential(user_id)
                .await?
                .ok_or(CredentialError::NoCredential)?;
            return self.unseal(&current.access_token);
        }

        info!(user = %user_id, expires_at = %refreshed.expires_at, "Access token refreshed");
        Ok(refreshed.access_token)
    }
}

#[async_trait::async_trait]
impl IAccessTokenSource for CredentialVault {
    async fn ensure_valid_access_token(
        &self,
        user_id: &UserId,
    ) -> Result<String, CredentialError> {
        let credential = self
            .store
            .get_credential(user_id)
            .await?
            .ok_or(CredentialError::NoCredential)?;

        if !credential.expires_within(self.refresh_margin) {
            return self.unseal(&credential.access_token);
        }

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;

        // Re-read: a concurrent caller may have refreshed while this one
        // waited for the lock.
        let credential = self
            .store
            .get_credential(user_id)
            .await?
            .ok_or(CredentialError::NoCredential)?;

        if !credential.expires_within(self.refresh_margin) {
            debug!(user = %user_id, "Token already refreshed by concurrent caller");
            return self.unseal(&credential.access_token);
        }

        self.refresh_locked(user_id, credential).await
    }
}

// ============================================================================
// Tests
// ============================================================================
