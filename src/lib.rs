//! lightsync - Client/Remote State Synchronization
//!
//! lightsync keeps a signed-in user's performance-audit state in sync across
//! devices and tabs: the single URL currently under audit, and the set of
//! push-notification delivery tokens subscribed to it. Local state is
//! synchronously readable and observable; the remote per-user document is
//! updated asynchronously through transactions and a live snapshot
//! subscription, and the two are reconciled with explicit precedence rules.
//!
//! # Overview
//!
//! - **`shared`** - plain data: document schema, identity, errors, config
//! - **`store`** - the process-wide observable state container
//! - **`loader`** - lazy, deduplicated loading of optional capabilities
//! - **`remote`** - boundary traits for the document store, auth, and
//!   messaging providers, plus an in-memory store implementation
//! - **`sync`** - the engine: session manager, snapshot reconciliation,
//!   and the two transactional managers
//!
//! # Wiring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lightsync::loader::CapabilityLoader;
//! use lightsync::remote::{DocumentStore, DocumentStoreLoader, MemoryDocumentStore};
//! use lightsync::shared::SyncConfig;
//! use lightsync::store::StateStore;
//! use lightsync::sync::{RemoteDocumentSync, UrlAuditTracker};
//!
//! let config = SyncConfig::new();
//! let store = StateStore::new();
//! let firestore: DocumentStoreLoader = Arc::new(CapabilityLoader::new(
//!     ["firestore"],
//!     || async {
//!         let backing: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
//!         Ok(backing)
//!     },
//! ));
//! let audit = UrlAuditTracker::new(config.clone(), store.clone(), firestore.clone());
//! let sync = RemoteDocumentSync::new(config, store, firestore, audit);
//! ```
//!
//! # Concurrency
//!
//! All work is non-blocking async on tokio. Suspension points are exactly:
//! waiting for a capability to load, waiting for a transaction round-trip,
//! and waiting for the next pushed snapshot. Handlers re-read the state
//! store after every suspension instead of trusting captured values.
//!
//! # Error Handling
//!
//! Every remote failure is local-recoverable: the engine degrades to a
//! local-only mode where audits still run and URLs are still tracked, just
//! not synced or notified. See [`shared::error::SyncError`].

/// Shared types and data structures
pub mod shared;

/// Process-wide observable state
pub mod store;

/// Lazy capability loading
pub mod loader;

/// Remote provider boundaries
pub mod remote;

/// The sync engine
pub mod sync;
