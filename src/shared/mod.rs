//! Shared Module
//!
//! This module contains types and data structures shared across the sync
//! engine: the remote document schema, the signed-in identity, the error
//! taxonomy, and configuration.
//!
//! # Overview
//!
//! Everything here is plain data. The components in [`crate::sync`] own the
//! behavior; these types only describe what flows between them and the
//! remote store.

/// Remote user document schema and merge-write payloads
pub mod document;

/// Shared error types
pub mod error;

/// Sync engine configuration
pub mod config;

/// Signed-in identity
pub mod identity;

/// Re-export commonly used types for convenience
pub use config::{ConfigError, SyncConfig, SyncConfigBuilder};
pub use document::{DocumentUpdate, FieldWrite, Snapshot, UserDocument};
pub use error::SyncError;
pub use identity::Identity;
