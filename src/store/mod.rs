//! Local State Store
//!
//! Process-wide observable application state. Any component may read the
//! current state synchronously; writes happen only through the named update
//! operations below, never through ad hoc field mutation from outside.
//!
//! # Observability
//!
//! The store publishes on change through `tokio::sync::watch`: observers get
//! a receiver from [`StateStore::subscribe`] and see every committed state.
//! This keeps the single-writer discipline auditable - there is exactly one
//! `watch::Sender` and it lives inside the store.
//!
//! # Lifecycle
//!
//! State is created at process start with default values, mutated throughout
//! the session, and discarded on teardown. It is never persisted locally;
//! the remote user document is the only durable state.

use std::sync::Arc;

use tokio::sync::watch;

use crate::shared::Identity;
use chrono::{DateTime, Utc};

/// Local application state, one instance per process
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Whether a user is currently signed in
    pub is_signed_in: bool,
    /// The signed-in user, if any
    pub user: Option<Identity>,
    /// URL the user is currently tracking; `None` when no URL is set
    pub user_url: Option<String>,
    /// Earliest time the tracked URL was seen, from the remote document
    pub user_url_seen: Option<DateTime<Utc>>,
    /// Whether audit results for the tracked URL should be fetched
    pub user_url_results_pending: bool,
    /// Non-null while a local audit run owns the URL and will write its own
    /// results back remotely
    pub active_lighthouse_url: Option<String>,
    /// Whether this device has a registered messaging token
    pub has_registered_messaging: bool,
    /// Whether a messaging subscription update is in flight
    pub pending_messaging_update: bool,
    /// Whether the initial signed-in check is still outstanding
    pub checking_signed_in_state: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            is_signed_in: false,
            user: None,
            user_url: None,
            user_url_seen: None,
            user_url_results_pending: false,
            active_lighthouse_url: None,
            has_registered_messaging: false,
            pending_messaging_update: false,
            // true until the auth provider reports for the first time
            checking_signed_in_state: true,
        }
    }
}

/// Observable container for [`AppState`]
///
/// Cheap to clone; all clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct StateStore {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store holding the default state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Read the current state
    pub fn get(&self) -> AppState {
        self.tx.borrow().clone()
    }

    /// Observe state changes; the receiver always starts at the current state
    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    fn update(&self, mutate: impl FnOnce(&mut AppState)) {
        self.tx.send_modify(mutate);
    }

    /// Record whether the initial signed-in check is still outstanding
    pub fn set_checking_signed_in_state(&self, checking: bool) {
        self.update(|state| state.checking_signed_in_state = checking);
    }

    /// Record a successful sign-in
    pub fn set_signed_in(&self, user: Identity) {
        tracing::debug!("[State] signed in as {}", user.uid);
        self.update(|state| {
            state.is_signed_in = true;
            state.user = Some(user);
        });
    }

    /// Clear everything tied to the signed-in session.
    ///
    /// `user_url` and `active_lighthouse_url` survive: a local audit may be
    /// in flight independent of sign-in and must not lose its URL.
    pub fn clear_signed_in_state(&self) {
        tracing::debug!("[State] clearing signed-in state");
        self.update(|state| {
            state.is_signed_in = false;
            state.user = None;
            state.user_url_seen = None;
            state.user_url_results_pending = false;
            state.has_registered_messaging = false;
            state.pending_messaging_update = false;
        });
    }

    /// Adopt a URL from the remote document (cross-device change or fresh
    /// sign-in with no local URL)
    pub fn adopt_remote_url(
        &self,
        url: &str,
        seen: Option<DateTime<Utc>>,
        results_pending: bool,
    ) {
        tracing::debug!("[State] adopting remote URL {:?}", url);
        self.update(|state| {
            state.user_url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
            state.user_url_seen = seen;
            state.user_url_results_pending = results_pending;
        });
    }

    /// Record a locally chosen URL (e.g. the user started an audit)
    pub fn set_user_url(&self, url: &str, seen: Option<DateTime<Utc>>) {
        self.update(|state| {
            state.user_url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
            state.user_url_seen = seen;
        });
    }

    /// Update the earliest-seen time for the tracked URL
    pub fn set_user_url_seen(&self, seen: Option<DateTime<Utc>>) {
        self.update(|state| state.user_url_seen = seen);
    }

    /// Mark or clear the URL owned by an in-flight local audit run
    pub fn set_active_lighthouse_url(&self, url: Option<String>) {
        self.update(|state| state.active_lighthouse_url = url);
    }

    /// Record whether this device has a registered messaging token
    pub fn set_messaging_registered(&self, registered: bool) {
        self.update(|state| state.has_registered_messaging = registered);
    }

    /// Record whether a messaging subscription update is in flight
    pub fn set_pending_messaging_update(&self, pending: bool) {
        self.update(|state| state.pending_messaging_update = pending);
    }
}
