//! Photosort Drive - Google Drive API adapter
//!
//! Provides the async client for:
//! - Listing the children of a folder (paged, exhausted per call)
//! - Fetching a change start cursor
//! - Consuming the change feed page by page
//!
//! All HTTP calls retry transient failures (429, rate-limited 403, 5xx,
//! network errors) with exponential backoff; non-transient failures map to
//! the typed [`ProviderError`](photosort_core::ports::ProviderError)
//! taxonomy the engine branches on.
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client with backoff
//! - [`files`] - Children listing and file DTO mapping
//! - [`changes`] - Change feed and cursor handling
//! - [`provider`] - `IDriveProvider` port implementation

pub mod changes;
pub mod client;
pub mod files;
pub mod provider;

pub use client::DriveClient;
pub use provider::GoogleDriveProvider;
