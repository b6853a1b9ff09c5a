//! Remote Boundaries
//!
//! Traits for the external collaborators the sync engine talks to: the
//! document store, the auth provider, and the messaging (push token)
//! provider. The engine owns none of these; it consumes them through these
//! interfaces so the core logic stays testable against in-process fakes.
//!
//! # Document store contract
//!
//! - `get_document` returns the current snapshot of one document.
//! - `subscribe` attaches a listener: every committed version of the
//!   document is delivered, in commit order, at least once. The initial
//!   snapshot arrives immediately after attachment.
//! - `run_transaction` performs an atomic read-modify-write. The closure
//!   receives the snapshot read inside the transaction (read-before-write is
//!   mandatory) and returns a merge-write payload; fields it does not name
//!   are preserved.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::loader::CapabilityLoader;
use crate::shared::{DocumentUpdate, Identity, Snapshot, SyncError};

/// In-process document store backing for tests and local development
pub mod memory;

pub use memory::MemoryDocumentStore;

/// The read-modify-write body of a transaction: reads the snapshot, returns
/// the merge-write to commit
pub type TransactionFn = Box<dyn FnOnce(&Snapshot) -> Result<DocumentUpdate, SyncError> + Send>;

/// Idempotent detach callback for a live subscription
pub type Detacher = Arc<dyn Fn() + Send + Sync>;

/// A document database offering transactional read-modify-write and live
/// per-document subscriptions
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current snapshot of a document
    async fn get_document(&self, doc_id: &str) -> Result<Snapshot, SyncError>;

    /// Attach a listener to a document; the current snapshot is delivered
    /// first, then every committed version in order
    async fn subscribe(&self, doc_id: &str) -> Result<DocumentSubscription, SyncError>;

    /// Run an atomic read-modify-write against a document
    async fn run_transaction(&self, doc_id: &str, body: TransactionFn) -> Result<(), SyncError>;
}

/// A live listener on one document
pub struct DocumentSubscription {
    snapshots: mpsc::UnboundedReceiver<Snapshot>,
    detach: Detacher,
}

impl DocumentSubscription {
    /// Create a subscription from a snapshot stream and a detach callback.
    ///
    /// The detach callback must be safe to call any number of times.
    pub fn new(snapshots: mpsc::UnboundedReceiver<Snapshot>, detach: Detacher) -> Self {
        Self { snapshots, detach }
    }

    /// Wait for the next snapshot; `None` once detached and drained
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.snapshots.recv().await
    }

    /// A handle that detaches this listener; callable from anywhere,
    /// idempotent
    pub fn detacher(&self) -> Detacher {
        self.detach.clone()
    }

    /// Detach this listener; safe to call more than once
    pub fn detach(&self) {
        (self.detach)();
    }
}

/// The external auth provider
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Interactively sign the user in; `None` when the user aborted
    async fn sign_in(&self) -> Result<Option<Identity>, SyncError>;

    /// Sign the current user out
    async fn sign_out(&self) -> Result<(), SyncError>;
}

/// The external push messaging provider
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Current delivery token for this device; `None` when the user has not
    /// granted notification permission
    async fn get_token(&self) -> Result<Option<String>, SyncError>;
}

/// Lazy loader handle for the document store capability
pub type DocumentStoreLoader = Arc<CapabilityLoader<Arc<dyn DocumentStore>>>;

/// Lazy loader handle for the auth capability
pub type AuthLoader = Arc<CapabilityLoader<Arc<dyn AuthClient>>>;

/// Lazy loader handle for the messaging capability; resolves to `None` on
/// platforms without push support
pub type MessagingLoader = Arc<CapabilityLoader<Option<Arc<dyn MessagingClient>>>>;
