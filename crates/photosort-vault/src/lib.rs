//! Photosort Vault - OAuth credential custody
//!
//! Owns the one OAuth credential each user holds:
//! - Token material is persisted only in AEAD-sealed form; plaintext exists
//!   transiently inside this crate's boundary.
//! - Access tokens are transparently refreshed shortly before expiry.
//! - Concurrent callers for the same user never race a refresh: a per-user
//!   in-process lock serializes the decision, and a compare-and-swap on the
//!   stored row's version serializes writers across processes.
//!
//! ## Modules
//!
//! - [`sealer`] - AEAD sealing behind the `Sealer` capability trait
//! - [`refresh`] - refresh-token exchange against the provider token endpoint
//! - [`vault`] - the `CredentialVault` implementing `IAccessTokenSource`

pub mod refresh;
pub mod sealer;
pub mod vault;

pub use refresh::{ITokenRefresher, OAuthTokenRefresher, RefreshedTokens};
pub use sealer::{Sealer, XChaChaSealer};
pub use vault::CredentialVault;
