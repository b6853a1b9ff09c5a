//! URL Audit Tracker
//!
//! Records the URL a signed-in user is auditing into their remote document,
//! resolving conflicting first-seen timestamps. The stored time for a URL
//! only ever moves earlier: whichever device saw the URL first wins, no
//! matter which one writes last.
//!
//! # Failure policy
//!
//! A failed remote write never fails the caller's audit flow. The error is
//! reported through tracing and the caller's own timestamp is returned so
//! the audit proceeds with local state only.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::remote::{DocumentStoreLoader, TransactionFn};
use crate::shared::{DocumentUpdate, SyncConfig};
use crate::store::StateStore;

/// Transactional writer for `currentUrl` and the `urls` first-seen map
#[derive(Clone)]
pub struct UrlAuditTracker {
    config: SyncConfig,
    store: StateStore,
    firestore: DocumentStoreLoader,
}

impl UrlAuditTracker {
    /// Create a tracker over the shared state store and document store
    /// capability
    pub fn new(config: SyncConfig, store: StateStore, firestore: DocumentStoreLoader) -> Self {
        Self {
            config,
            store,
            firestore,
        }
    }

    /// Record `url` as the user's current URL and reconcile its first-seen
    /// time against `audited_on`.
    ///
    /// Returns the authoritative earliest-seen timestamp for the URL, or
    /// `None` when no user is signed in (the caller proceeds with local
    /// state only). Epoch-zero timestamps are treated as absent on both
    /// sides of the comparison.
    pub async fn record_url(
        &self,
        url: &str,
        audited_on: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        let Some(user) = self.store.get().user else {
            // not signed in, so the user has never seen this site remotely
            return None;
        };
        let doc_id = self.config.user_doc_path(&user.uid);

        let firestore = match self.firestore.load().await {
            Ok(firestore) => firestore,
            Err(err) => {
                tracing::warn!("[Audit] document store unavailable: {}", err);
                return audited_on;
            }
        };

        let earliest = Arc::new(Mutex::new(audited_on));
        let body: TransactionFn = {
            let url = url.to_string();
            let earliest = earliest.clone();
            Box::new(move |snapshot| {
                let data = snapshot.data();
                // currentUrl is written unconditionally: the store demands
                // that every document read in a transaction is written again.
                let mut update = DocumentUpdate {
                    current_url: Some(url.clone()),
                    ..Default::default()
                };

                let valid = audited_on.filter(|at| at.timestamp() != 0);
                let stored = data
                    .urls
                    .get(&url)
                    .copied()
                    .filter(|seen| seen.timestamp() != 0);

                let resolved = match (stored, valid) {
                    (Some(seen), Some(at)) => {
                        if at < seen {
                            update.set_urls.insert(url.clone(), at);
                        }
                        Some(seen.min(at))
                    }
                    (Some(seen), None) => Some(seen),
                    (None, Some(at)) => {
                        update.set_urls.insert(url.clone(), at);
                        Some(at)
                    }
                    (None, None) => audited_on,
                };
                *earliest.lock().unwrap_or_else(PoisonError::into_inner) = resolved;

                Ok(update)
            })
        };

        if let Err(err) = firestore.run_transaction(&doc_id, body).await {
            // The audit still runs with the new URL; only remote persistence
            // is lost.
            tracing::warn!("[Audit] could not write URL for {}: {}", user.uid, err);
            return audited_on;
        }

        let resolved = *earliest.lock().unwrap_or_else(PoisonError::into_inner);
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::CapabilityLoader;
    use crate::remote::{DocumentStore, MemoryDocumentStore};
    use crate::shared::Identity;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn tracker(memory: &MemoryDocumentStore) -> (UrlAuditTracker, StateStore) {
        let store = StateStore::new();
        let backing: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        let loader: DocumentStoreLoader = Arc::new(CapabilityLoader::new(["firestore"], {
            move || {
                let backing = backing.clone();
                async move { Ok(backing) }
            }
        }));
        let config = SyncConfig::builder().build().unwrap();
        (
            UrlAuditTracker::new(config, store.clone(), loader),
            store,
        )
    }

    #[tokio::test]
    async fn test_signed_out_returns_none_without_remote_effect() {
        let memory = MemoryDocumentStore::new();
        let (tracker, _store) = tracker(&memory);

        let result = tracker.record_url("https://a", Some(ts(5))).await;
        assert!(result.is_none());
        assert!(memory.document("users/u1").is_none());
    }

    #[tokio::test]
    async fn test_first_record_stores_timestamp() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));

        let result = tracker.record_url("https://y", Some(ts(5))).await;
        assert_eq!(result, Some(ts(5)));

        let doc = memory.document("users/u1").unwrap();
        assert_eq!(doc.current_url.as_deref(), Some("https://y"));
        assert_eq!(doc.urls.get("https://y"), Some(&ts(5)));
    }

    #[tokio::test]
    async fn test_earlier_timestamp_lowers_stored_value() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));

        tracker.record_url("https://y", Some(ts(5))).await;
        let result = tracker.record_url("https://y", Some(ts(3))).await;
        assert_eq!(result, Some(ts(3)));

        let doc = memory.document("users/u1").unwrap();
        assert_eq!(doc.urls.get("https://y"), Some(&ts(3)));
    }

    #[tokio::test]
    async fn test_later_timestamp_loses_to_stored_value() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));

        tracker.record_url("https://y", Some(ts(3))).await;
        let result = tracker.record_url("https://y", Some(ts(9))).await;
        assert_eq!(result, Some(ts(3)));

        let doc = memory.document("users/u1").unwrap();
        assert_eq!(doc.urls.get("https://y"), Some(&ts(3)));
    }

    #[tokio::test]
    async fn test_epoch_zero_timestamp_not_stored() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));

        tracker.record_url("https://y", Some(ts(0))).await;
        let doc = memory.document("users/u1").unwrap();
        assert_eq!(doc.current_url.as_deref(), Some("https://y"));
        assert!(doc.urls.is_empty());
    }

    #[tokio::test]
    async fn test_none_timestamp_still_sets_current_url() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));

        let result = tracker.record_url("https://y", None).await;
        assert!(result.is_none());
        let doc = memory.document("users/u1").unwrap();
        assert_eq!(doc.current_url.as_deref(), Some("https://y"));
    }

    #[tokio::test]
    async fn test_transaction_failure_is_swallowed() {
        let memory = MemoryDocumentStore::new();
        let (tracker, store) = tracker(&memory);
        store.set_signed_in(Identity::new("u1"));
        memory.inject_transaction_failure();

        // the caller still gets its own timestamp back and can proceed
        let result = tracker.record_url("https://y", Some(ts(5))).await;
        assert_eq!(result, Some(ts(5)));
        assert!(memory.document("users/u1").is_none());
    }
}
