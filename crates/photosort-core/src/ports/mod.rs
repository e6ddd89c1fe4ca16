//! Port definitions (hexagonal architecture)
//!
//! Traits the adapter crates implement:
//! - [`IDriveProvider`](drive_provider::IDriveProvider) - remote tree API (photosort-drive)
//! - [`IMirrorRepository`](mirror_repository::IMirrorRepository) - local mirror persistence (photosort-store)
//! - [`ICredentialStore`](credentials::ICredentialStore) - sealed token persistence (photosort-store)
//! - [`IAccessTokenSource`](credentials::IAccessTokenSource) - valid-token provision (photosort-vault)
//! - [`INotificationSink`](notification::INotificationSink) - orphan-event recording (host application)

pub mod credentials;
pub mod drive_provider;
pub mod mirror_repository;
pub mod notification;

pub use credentials::{CredentialError, IAccessTokenSource, ICredentialStore};
pub use drive_provider::{ChangeRecord, ChangesPage, IDriveProvider, ProviderError, RemoteChild};
pub use mirror_repository::{IMirrorRepository, StoreError};
pub use notification::{INotificationSink, OrphanNotice};
