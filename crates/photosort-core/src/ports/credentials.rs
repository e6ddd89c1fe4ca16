//! Credential ports (driven/secondary ports)
//!
//! Two interfaces around OAuth token material:
//!
//! - [`ICredentialStore`] - persistence of AEAD-sealed token rows, including
//!   the compare-and-swap primitive the vault uses to serialize refreshes.
//! - [`IAccessTokenSource`] - what the rest of the engine consumes: "give me
//!   a currently valid access token for this user". Implemented by the
//!   credential vault; test doubles hand out fixed tokens.
//!
//! Plaintext tokens never cross either interface; only the vault sees them.

use thiserror::Error;

use crate::domain::{newtypes::UserId, StoredCredential};

use super::mirror_repository::StoreError;

// ============================================================================
// CredentialError
// ============================================================================

/// Failure taxonomy for credential operations
///
/// The distinctions matter to callers: `NeedsReconsent` and
/// `InsufficientScope` require user re-authorization, `ProviderUnavailable`
/// is retryable, `NoCredential` means the user never connected an account.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The user has never connected a drive account
    #[error("No credential stored for user")]
    NoCredential,

    /// The refresh token is invalid or revoked; a full re-authorization is required
    #[error("Refresh token rejected, re-consent required: {0}")]
    NeedsReconsent(String),

    /// The token is valid but lacks a required permission
    #[error("Insufficient scope: {0}")]
    InsufficientScope(String),

    /// The token endpoint was unreachable or returned a transient error
    #[error("Token endpoint unavailable: {0}")]
    ProviderUnavailable(String),

    /// Sealing or unsealing token material failed
    #[error("Credential sealing error: {0}")]
    Sealing(String),

    /// The underlying credential store failed
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),
}

// ============================================================================
// ICredentialStore trait
// ============================================================================

/// Port trait for sealed-credential persistence
///
/// The store treats token bytes as opaque; sealing happens in the vault.
#[async_trait::async_trait]
pub trait ICredentialStore: Send + Sync {
    /// Retrieves the sealed credential row for a user
    async fn get_credential(
        &self,
        user_id: &UserId,
    ) -> Result<Option<StoredCredential>, StoreError>;

    /// Inserts or replaces the credential row unconditionally
    ///
    /// Used when an account is first connected; assigns version 1.
    async fn put_credential(&self, credential: &StoredCredential) -> Result<(), StoreError>;

    /// Replaces the credential row only if its version still equals `expected_version`
    ///
    /// Returns `true` when the swap happened, `false` when a concurrent
    /// writer got there first (the caller should re-read instead of
    /// retrying its own write).
    async fn compare_and_swap_credential(
        &self,
        credential: &StoredCredential,
        expected_version: i64,
    ) -> Result<bool, StoreError>;

    /// Removes the credential row for a user
    async fn delete_credential(&self, user_id: &UserId) -> Result<(), StoreError>;
}

// ============================================================================
// IAccessTokenSource trait
// ============================================================================

/// Port trait for obtaining a currently valid access token
#[async_trait::async_trait]
pub trait IAccessTokenSource: Send + Sync {
    /// Returns a plaintext access token valid for at least a few minutes
    ///
    /// Transparently refreshes an expiring token first; concurrent callers
    /// for the same user never trigger duplicate refreshes.
    async fn ensure_valid_access_token(&self, user_id: &UserId)
        -> Result<String, CredentialError>;
}
