//! Photosort Sync - the drive synchronization engine
//!
//! Keeps the local mirror consistent with a user's remote drive tree across
//! three phases:
//!
//! 1. **Full tree indexing** - a budgeted, resumable breadth-first walk of
//!    the chosen root folder, driven by a durable pending-folder queue
//!    ([`runner`]).
//! 2. **Incremental change application** - cursor-based consumption of the
//!    provider change feed ([`puller`]).
//! 3. **Orphan reconciliation** - items not re-observed across a completed
//!    full pass are marked missing, never deleted ([`reconciler`]).
//!
//! The [`SyncEngine`](engine::SyncEngine) facade owns the status lattice
//! (`idle -> running -> idle | error`) and is what the surrounding web
//! application calls. [`BackgroundSync`](background::BackgroundSync) drives
//! the budgeted walk to completion on a fixed delay for hosts that prefer a
//! server-side loop over client-driven polling.
//!
//! Every mirror write is an idempotent upsert keyed on the remote identity,
//! so any step can be retried after partial failure without duplicating or
//! losing records.

pub mod background;
pub mod engine;
pub mod puller;
pub mod reconciler;
pub mod runner;

use thiserror::Error;

use photosort_core::ports::{CredentialError, ProviderError, StoreError};

pub use background::BackgroundSync;
pub use engine::{BatchOutcome, PullOutcome, SyncDiagnostics, SyncEngine};

/// Errors surfaced by the sync engine to the host application
///
/// The taxonomy is what the host maps to user-visible behavior:
/// `NeedsReconsent`/`InsufficientScope` mean "reconnect your account",
/// `RootMismatch` means "folder changed, retry", `Busy` means "poll again",
/// and `ProviderUnavailable`/`Repository` mean "sync failed, try again".
#[derive(Debug, Error)]
pub enum SyncError {
    /// The user has never connected a drive account
    #[error("No credential stored for user")]
    NoCredential,

    /// Drive access was revoked; the user must re-authorize
    #[error("Drive access must be re-authorized: {0}")]
    NeedsReconsent(String),

    /// The granted OAuth scope lacks a required permission
    #[error("Drive permission missing: {0}")]
    InsufficientScope(String),

    /// The provider stayed unreachable through the retry ceiling
    #[error("Drive unavailable: {0}")]
    ProviderUnavailable(String),

    /// Settings changed underneath a running sync; the caller must re-arm
    #[error("Sync root changed: armed for folder {armed} but settings select {selected}")]
    RootMismatch {
        /// Root the state machine is armed for
        armed: String,
        /// Root currently selected in the settings
        selected: String,
    },

    /// Another batch for the same user is in flight; poll and retry
    #[error("A sync batch is already running for this user")]
    Busy,

    /// No root folder has been armed yet
    #[error("Sync has not been armed with a root folder")]
    NotArmed,

    /// The state machine is in the error state; re-arm to recover
    #[error("Sync is in error state ({0}); re-arm to recover")]
    InErrorState(String),

    /// A non-transient provider failure that is not its own taxon
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Local persistence failure; safe to retry (all writes are idempotent)
    #[error("Repository error: {0}")]
    Repository(#[from] StoreError),

    /// Credential machinery failure outside the refresh taxonomy
    #[error("Credential error: {0}")]
    Credential(String),
}

impl From<CredentialError> for SyncError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::NoCredential => SyncError::NoCredential,
            CredentialError::NeedsReconsent(msg) => SyncError::NeedsReconsent(msg),
            CredentialError::InsufficientScope(msg) => SyncError::InsufficientScope(msg),
            CredentialError::ProviderUnavailable(msg) => SyncError::ProviderUnavailable(msg),
            CredentialError::Sealing(msg) => SyncError::Credential(msg),
            CredentialError::Store(e) => SyncError::Repository(e),
        }
    }
}

impl From<ProviderError> for SyncError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Unavailable(msg) => SyncError::ProviderUnavailable(msg),
            ProviderError::InsufficientScope(msg) => SyncError::InsufficientScope(msg),
            // A 401 on a token the vault just validated means the grant was
            // revoked mid-flight.
            ProviderError::Unauthorized(msg) => SyncError::NeedsReconsent(msg),
            other => SyncError::Provider(other),
        }
    }
}

impl SyncError {
    /// True for failures that should transition the state machine to `error`
    ///
    /// Stale-request signals (`RootMismatch`, `Busy`) and missing-arm
    /// conditions report to the caller without poisoning the persisted
    /// state.
    pub fn poisons_state(&self) -> bool {
        !matches!(
            self,
            SyncError::RootMismatch { .. }
                | SyncError::Busy
                | SyncError::NotArmed
                | SyncError::InErrorState(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_error_mapping() {
        assert!(matches!(
            SyncError::from(CredentialError::NoCredential),
            SyncError::NoCredential
        ));
        assert!(matches!(
            SyncError::from(CredentialError::NeedsReconsent("revoked".into())),
            SyncError::NeedsReconsent(_)
        ));
    }

    #[test]
    fn test_provider_error_mapping() {
        assert!(matches!(
            SyncError::from(ProviderError::Unavailable("503".into())),
            SyncError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            SyncError::from(ProviderError::Unauthorized("revoked".into())),
            SyncError::NeedsReconsent(_)
        ));
        assert!(matches!(
            SyncError::from(ProviderError::NotFound("gone".into())),
            SyncError::Provider(ProviderError::NotFound(_))
        ));
    }

    #[test]
    fn test_stale_request_signals_do_not_poison_state() {
        assert!(!SyncError::Busy.poisons_state());
        assert!(!SyncError::RootMismatch {
            armed: "a".into(),
            selected: "b".into()
        }
        .poisons_state());
        assert!(SyncError::ProviderUnavailable("x".into()).poisons_state());
    }
}
