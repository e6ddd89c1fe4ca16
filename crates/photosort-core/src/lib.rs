//! Photosort Core - Domain logic for the drive synchronization engine
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `FolderRecord`, `MediaItem`, `SyncState`, `SyncSettings`, `StoredCredential`
//! - **Port definitions** - Traits for adapters: `DriveProvider`, `MirrorRepository`,
//!   `CredentialStore`, `AccessTokenSource`, `NotificationSink`
//! - **Typed configuration** - YAML-backed settings for the engine
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement; the sync engine
//! orchestrates domain entities exclusively through those ports.

pub mod config;
pub mod domain;
pub mod ports;
