//! Remote Document Sync
//!
//! Maintains exactly one live listener on the signed-in user's remote
//! document and reconciles every inbound snapshot against local state.
//!
//! # Precedence rules
//!
//! Each snapshot is evaluated against these rules, in order:
//!
//! 1. A local audit run owns the URL (`active_lighthouse_url` set): do
//!    nothing, the run will write its own results remotely.
//! 2. The previously reconciled remote URL differs from the snapshot's:
//!    another device changed the target URL, adopt the remote value.
//! 3. No local URL is set: adopt the remote value (fresh sign-in with no
//!    local audit yet).
//! 4. First snapshot since subscribing while a local URL exists: the local
//!    value is authoritative, push it remotely and stop.
//! 5. Otherwise the snapshot concerns a field this sync ignores (token
//!    churn, say): no state change.
//!
//! Reconciliation is idempotent; the same snapshot delivered twice leaves
//! local state identical. A snapshot that arrives after teardown is dropped
//! before it can touch state.
//!
//! # Cancellation
//!
//! Listener attachment has to wait for the document store capability, so
//! sign-out can overtake it. Each subscription attempt owns a
//! [`SubscriptionGuard`]: tearing down sets the `unsubscribed` flag and
//! detaches the listener if one was attached, and the attachment step checks
//! the flag under the same lock before attaching. A guard can stop new
//! listener attachment, but never a transaction that already committed
//! remotely. The flag is consulted between snapshots, not within a
//! reconcile pass: a teardown that lands while a pass is executing lets
//! that one snapshot finish, and every later snapshot is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::remote::{Detacher, DocumentStoreLoader};
use crate::shared::{Snapshot, SyncConfig};
use crate::store::StateStore;
use crate::sync::audit::UrlAuditTracker;

/// Guard for one subscription attempt
///
/// Created with `unsubscribed = false`; cancelling sets the flag and runs
/// the detach callback if a listener was already attached.
pub(crate) struct SubscriptionGuard {
    unsubscribed: AtomicBool,
    detach: Mutex<Option<Detacher>>,
}

impl SubscriptionGuard {
    pub(crate) fn new() -> Self {
        Self {
            unsubscribed: AtomicBool::new(false),
            detach: Mutex::new(None),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.unsubscribed.load(Ordering::SeqCst)
    }

    /// Register the detach callback for an attached listener. Returns
    /// `false` when the guard was cancelled first; the caller must then
    /// detach the listener itself.
    pub(crate) fn attach(&self, detach: Detacher) -> bool {
        let mut slot = self.detach.lock().unwrap_or_else(PoisonError::into_inner);
        if self.unsubscribed.load(Ordering::SeqCst) {
            return false;
        }
        *slot = Some(detach);
        true
    }

    /// Cancel this attempt; safe to call more than once
    pub(crate) fn cancel(&self) {
        let detach = {
            let mut slot = self.detach.lock().unwrap_or_else(PoisonError::into_inner);
            self.unsubscribed.store(true, Ordering::SeqCst);
            slot.take()
        };
        if let Some(detach) = detach {
            detach();
        }
    }
}

/// Live subscription to the signed-in user's remote document
///
/// Cheap to clone; all clones share one subscription slot.
#[derive(Clone)]
pub struct RemoteDocumentSync {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    config: SyncConfig,
    store: StateStore,
    firestore: DocumentStoreLoader,
    audit: UrlAuditTracker,
    /// Last remote URL this sync reconciled; `None` until the first
    /// non-empty remote URL lands (or after `reset_last_saved`)
    last_saved_url: Mutex<Option<String>>,
    guard: Mutex<Option<Arc<SubscriptionGuard>>>,
}

impl RemoteDocumentSync {
    /// Create a sync over the shared state store, document store capability,
    /// and URL audit tracker
    pub fn new(
        config: SyncConfig,
        store: StateStore,
        firestore: DocumentStoreLoader,
        audit: UrlAuditTracker,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                config,
                store,
                firestore,
                audit,
                last_saved_url: Mutex::new(None),
                guard: Mutex::new(None),
            }),
        }
    }

    /// Forget the last reconciled remote URL, so the next snapshot counts
    /// as the first one of a fresh session
    pub fn reset_last_saved(&self) {
        *self
            .inner
            .last_saved_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Subscribe to the given user's remote document, replacing any
    /// existing subscription
    pub fn subscribe(&self, uid: &str) {
        self.unsubscribe();

        let guard = Arc::new(SubscriptionGuard::new());
        *self
            .inner
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(guard.clone());

        let sync = self.clone();
        let doc_id = self.inner.config.user_doc_path(uid);
        tokio::spawn(async move {
            // The listener cannot attach until the document store capability
            // is loaded; sign-out may overtake this await.
            let firestore = match sync.inner.firestore.load().await {
                Ok(firestore) => firestore,
                Err(err) => {
                    tracing::warn!("[Sync] failed to load document store: {}", err);
                    return;
                }
            };
            if guard.is_cancelled() {
                return;
            }

            let mut subscription = match firestore.subscribe(&doc_id).await {
                Ok(subscription) => subscription,
                Err(err) => {
                    tracing::warn!("[Sync] listener attachment failed for {}: {}", doc_id, err);
                    return;
                }
            };
            if !guard.attach(subscription.detacher()) {
                // torn down while we were attaching
                subscription.detach();
                return;
            }

            while let Some(snapshot) = subscription.next().await {
                if guard.is_cancelled() {
                    break;
                }
                sync.reconcile(snapshot).await;
            }
        });
    }

    /// Tear down the current subscription, if any; safe to call repeatedly
    pub fn unsubscribe(&self) {
        let guard = self
            .inner
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(guard) = guard {
            guard.cancel();
        }
    }

    fn last_saved(&self) -> Option<String> {
        self.inner
            .last_saved_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_last_saved(&self, url: Option<String>) {
        *self
            .inner
            .last_saved_url
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = url;
    }

    /// Apply the precedence rules to one inbound snapshot
    pub(crate) async fn reconcile(&self, snapshot: Snapshot) {
        let data = snapshot.data();
        let saved_url = data.current_url.clone().filter(|url| !url.is_empty());

        let state = self.inner.store.get();
        let last_saved = self.last_saved();

        let adopt = if state.active_lighthouse_url.is_some() {
            // Rule 1: the active audit run will write its results itself,
            // which in turn triggers a remote write.
            false
        } else if last_saved.is_some() && last_saved != saved_url {
            // Rule 2: the user changed their target URL on another device.
            true
        } else if state.user_url.is_none() {
            // Rule 3: nothing was tracked locally before sign-in.
            true
        } else if last_saved.is_none() {
            // Rule 4: first snapshot of the session, but a URL was already
            // tracked locally. The local value is authoritative: push it up
            // and preempt the snapshot via the last-saved marker.
            let user_url = state.user_url.clone().unwrap_or_default();
            self.set_last_saved(Some(user_url.clone()));
            let earliest = self
                .inner
                .audit
                .record_url(&user_url, state.user_url_seen)
                .await;
            tracing::debug!(
                "[Sync] pushed local URL {:?} remotely (earliest seen {:?})",
                user_url,
                earliest
            );
            return;
        } else {
            // Rule 5: the snapshot changed a field this sync ignores.
            false
        };

        self.set_last_saved(saved_url.clone());

        if adopt {
            let seen = saved_url.as_ref().and_then(|url| data.urls.get(url)).copied();
            let results_pending = saved_url.is_some();
            self.inner.store.adopt_remote_url(
                saved_url.as_deref().unwrap_or(""),
                seen,
                results_pending,
            );
        }
    }
}
