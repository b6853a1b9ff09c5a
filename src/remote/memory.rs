//! In-memory document store
//!
//! A [`DocumentStore`] that lives entirely in-process. It honors the real
//! store's contract - serialized transactions, merge-writes, ordered
//! per-document snapshot delivery with an initial snapshot on attach - and
//! adds inspection and failure-injection helpers so engine behavior can be
//! exercised without a backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::remote::{DocumentStore, DocumentSubscription, TransactionFn};
use crate::shared::{Snapshot, SyncError, UserDocument};

type Subscribers = HashMap<String, Vec<(u64, mpsc::UnboundedSender<Snapshot>)>>;

/// In-process [`DocumentStore`] implementation
///
/// Cheap to clone; all clones share the same documents and listeners.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    documents: Mutex<HashMap<String, UserDocument>>,
    subscribers: Mutex<Subscribers>,
    next_subscriber: AtomicU64,
    fail_next_transaction: AtomicBool,
}

impl MemoryDocumentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `run_transaction` call fail with a transaction error
    pub fn inject_transaction_failure(&self) {
        self.inner.fail_next_transaction.store(true, Ordering::SeqCst);
    }

    /// Number of listeners currently attached to a document
    pub fn subscriber_count(&self, doc_id: &str) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(doc_id)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Current contents of a document, if it has ever been written
    pub fn document(&self, doc_id: &str) -> Option<UserDocument> {
        self.inner
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(doc_id)
            .cloned()
    }

    fn snapshot_of(documents: &HashMap<String, UserDocument>, doc_id: &str) -> Snapshot {
        Snapshot::new(doc_id, documents.get(doc_id).cloned())
    }

    /// Fan a snapshot out to every listener on the document, pruning
    /// listeners whose receiver side is gone
    fn publish(&self, doc_id: &str, snapshot: &Snapshot) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(listeners) = subscribers.get_mut(doc_id) {
            listeners.retain(|(_, tx)| tx.send(snapshot.clone()).is_ok());
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, doc_id: &str) -> Result<Snapshot, SyncError> {
        let documents = self
            .inner
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Self::snapshot_of(&documents, doc_id))
    }

    async fn subscribe(&self, doc_id: &str) -> Result<DocumentSubscription, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.next_subscriber.fetch_add(1, Ordering::SeqCst);

        // Registration and the initial snapshot happen under the documents
        // lock so no committed version can slip between them.
        {
            let documents = self
                .inner
                .documents
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let initial = Self::snapshot_of(&documents, doc_id);
            let mut subscribers = self
                .inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let _ = tx.send(initial);
            subscribers
                .entry(doc_id.to_string())
                .or_default()
                .push((id, tx));
        }

        let inner = self.inner.clone();
        let doc_key = doc_id.to_string();
        let detach: crate::remote::Detacher = Arc::new(move || {
            let mut subscribers = inner
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(listeners) = subscribers.get_mut(&doc_key) {
                listeners.retain(|(listener_id, _)| *listener_id != id);
            }
        });

        Ok(DocumentSubscription::new(rx, detach))
    }

    async fn run_transaction(&self, doc_id: &str, body: TransactionFn) -> Result<(), SyncError> {
        if self.inner.fail_next_transaction.swap(false, Ordering::SeqCst) {
            return Err(SyncError::transaction("injected failure"));
        }

        // The documents lock is held through read, apply, and publish so
        // transactions serialize and snapshot delivery stays in commit order.
        let mut documents = self
            .inner
            .documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let snapshot = Self::snapshot_of(&documents, doc_id);
        let update = body(&snapshot)?;

        let mut doc = documents.get(doc_id).cloned().unwrap_or_default();
        update.apply(&mut doc);
        documents.insert(doc_id.to_string(), doc.clone());

        self.publish(doc_id, &Snapshot::new(doc_id, Some(doc)));
        Ok(())
    }
}
