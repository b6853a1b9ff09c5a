//! Auth Session Manager
//!
//! Observes sign-in/sign-out transitions from the external auth provider
//! and drives the remote document subscription's lifecycle. The provider's
//! event stream fires at least once on startup, then on every transition;
//! each event lands in [`AuthSessionManager::handle_auth_state`].
//!
//! Sign-in and sign-out requests swallow and report provider errors:
//! callers observe state-store fields, not thrown errors, and the signed-out
//! local state is the safe fallback.

use tokio::sync::mpsc;

use crate::remote::AuthLoader;
use crate::shared::Identity;
use crate::store::StateStore;
use crate::sync::reconcile::RemoteDocumentSync;

/// Drives the subscription lifecycle from auth state transitions
pub struct AuthSessionManager {
    store: StateStore,
    sync: RemoteDocumentSync,
    auth: AuthLoader,
}

impl AuthSessionManager {
    /// Create a manager over the shared state store, document sync, and
    /// auth capability
    pub fn new(store: StateStore, sync: RemoteDocumentSync, auth: AuthLoader) -> Self {
        Self { store, sync, auth }
    }

    /// Apply one auth state transition.
    ///
    /// Tears down any existing subscription, then either clears the
    /// signed-in session (keeping `user_url` and any in-flight local audit
    /// untouched) or records the identity and establishes a fresh
    /// subscription to its remote document.
    pub fn handle_auth_state(&self, identity: Option<Identity>) {
        self.store.set_checking_signed_in_state(false);
        self.sync.unsubscribe();

        match identity {
            None => {
                self.store.clear_signed_in_state();
            }
            Some(user) => {
                tracing::info!("[Auth] signed in as {}", user.uid);
                let uid = user.uid.clone();
                self.store.set_signed_in(user);
                self.sync.reset_last_saved();
                self.sync.subscribe(&uid);
            }
        }
    }

    /// Consume an auth provider event stream until it closes
    pub async fn run(&self, mut events: mpsc::UnboundedReceiver<Option<Identity>>) {
        while let Some(identity) = events.recv().await {
            self.handle_auth_state(identity);
        }
        tracing::debug!("[Auth] event stream closed");
    }

    /// Request an interactive sign-in. Errors are reported and swallowed;
    /// the caller learns the outcome through the auth event stream.
    pub async fn sign_in(&self) -> Option<Identity> {
        let client = match self.auth.load().await {
            Ok(client) => client,
            Err(err) => {
                tracing::error!("[Auth] sign-in unavailable: {}", err);
                return None;
            }
        };
        match client.sign_in().await {
            Ok(identity) => identity,
            Err(err) => {
                tracing::error!("[Auth] sign-in error: {}", err);
                None
            }
        }
    }

    /// Request a sign-out. Errors are reported and swallowed.
    pub async fn sign_out(&self) {
        let client = match self.auth.load().await {
            Ok(client) => client,
            Err(err) => {
                tracing::error!("[Auth] sign-out unavailable: {}", err);
                return;
            }
        };
        if let Err(err) = client.sign_out().await {
            tracing::error!("[Auth] sign-out error: {}", err);
        }
    }
}
