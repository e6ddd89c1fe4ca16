//! Photosort Store - Local mirror persistence
//!
//! SQLite-based store for:
//! - Folder and media-item mirror rows
//! - The per-user sync state (work queue, cursor, counters)
//! - Sync settings (the chosen root folder)
//! - AEAD-sealed credential rows
//!
//! ## Architecture
//!
//! This crate implements the `IMirrorRepository` and `ICredentialStore`
//! ports from `photosort-core` using SQLite as the storage backend. It is a
//! driven (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteMirrorRepository`] - Port implementations over the pool
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use photosort_store::{DatabasePool, SqliteMirrorRepository};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/photosort/mirror.db")).await?;
//! let repo = SqliteMirrorRepository::new(pool.pool().clone());
//! // Use repo as IMirrorRepository / ICredentialStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use photosort_core::ports::StoreError;
pub use pool::DatabasePool;
pub use repository::SqliteMirrorRepository;
