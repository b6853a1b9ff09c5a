//! Subscription Token Manager
//!
//! Transactional maintenance of the user's notification delivery tokens and
//! the derived "has subscription" marker. [`TokenManager::update_subscription`]
//! is the only writer of the `tokens` and `subscription` fields; no other
//! component may touch them.
//!
//! [`MessagingManager`] wraps the token manager with the device-facing
//! flows: enabling/disabling notifications for this device and reacting to
//! token refresh events from the push provider.

use std::sync::{Mutex, PoisonError};

use chrono::Utc;

use crate::remote::{DocumentStoreLoader, MessagingLoader, TransactionFn};
use crate::shared::{DocumentUpdate, FieldWrite, SyncConfig, SyncError};
use crate::store::StateStore;

/// Transactional writer for `tokens` and the `subscription` marker
#[derive(Clone)]
pub struct TokenManager {
    config: SyncConfig,
    store: StateStore,
    firestore: DocumentStoreLoader,
}

impl TokenManager {
    /// Create a manager over the shared state store and document store
    /// capability
    pub fn new(config: SyncConfig, store: StateStore, firestore: DocumentStoreLoader) -> Self {
        Self {
            config,
            store,
            firestore,
        }
    }

    /// Register `token` for this device and optionally drop
    /// `existing_token`, keeping the `subscription` marker consistent with
    /// the resulting token set.
    ///
    /// Returns whether a remote write occurred. `false` when no user is
    /// signed in or there is nothing to change.
    pub async fn update_subscription(
        &self,
        token: Option<&str>,
        existing_token: Option<&str>,
    ) -> Result<bool, SyncError> {
        let Some(user) = self.store.get().user else {
            return Ok(false);
        };

        let token = token.filter(|t| !t.is_empty()).map(str::to_string);
        let existing = existing_token
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        if token.is_none() && existing.is_none() {
            return Ok(false);
        }

        let doc_id = self.config.user_doc_path(&user.uid);
        let firestore = self.firestore.load().await?;

        let now = Utc::now();
        let body: TransactionFn = Box::new(move |snapshot| {
            let data = snapshot.data();
            let mut update = DocumentUpdate::default();
            let mut tokens_after = data.tokens.clone();

            if let Some(existing) = &existing {
                if Some(existing) != token.as_ref() {
                    update.remove_tokens.insert(existing.clone());
                    tokens_after.remove(existing);
                }
            }
            if let Some(token) = &token {
                update.set_tokens.insert(token.clone(), now);
                tokens_after.insert(token.clone(), now);
            }

            // The marker must be present iff any token remains, so queries
            // indexed on it stay correct; clearing means deleting the field.
            let has_subscriptions = !tokens_after.is_empty();
            if has_subscriptions != data.has_subscription() {
                update.subscription = Some(if has_subscriptions {
                    FieldWrite::Set(now)
                } else {
                    FieldWrite::Delete
                });
            }

            Ok(update)
        });

        firestore.run_transaction(&doc_id, body).await?;
        Ok(true)
    }
}

/// Device-facing messaging flows built on [`TokenManager`]
pub struct MessagingManager {
    store: StateStore,
    tokens: TokenManager,
    messaging: MessagingLoader,
    /// Token this process last registered, handed back as the token to
    /// replace when the provider rotates it
    last_token: Mutex<Option<String>>,
}

impl MessagingManager {
    /// Create a manager over the shared state store, token manager, and
    /// messaging capability
    pub fn new(store: StateStore, tokens: TokenManager, messaging: MessagingLoader) -> Self {
        Self {
            store,
            tokens,
            messaging,
            last_token: Mutex::new(None),
        }
    }

    fn remembered_token(&self) -> Option<String> {
        self.last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember_token(&self, token: Option<String>) {
        *self
            .last_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Enable or disable notification delivery to this device.
    ///
    /// Returns whether a remote write occurred.
    pub async fn configure_messaging_subscription(
        &self,
        enable: bool,
    ) -> Result<bool, SyncError> {
        if self.store.get().pending_messaging_update {
            // Known race: a token refresh that lands while an update is in
            // flight is dropped here, so the stored token can go stale until
            // the next configuration change.
            tracing::debug!("[Messaging] update already pending, skipping");
            return Ok(false);
        }
        self.store.set_pending_messaging_update(true);

        let result = self.apply_configuration(enable).await;

        self.store.set_pending_messaging_update(false);
        result
    }

    async fn apply_configuration(&self, enable: bool) -> Result<bool, SyncError> {
        if !enable {
            let existing = self.remembered_token();
            let changed = self
                .tokens
                .update_subscription(None, existing.as_deref())
                .await?;
            self.remember_token(None);
            self.store.set_messaging_registered(false);
            return Ok(changed);
        }

        let Some(client) = self.messaging.load().await? else {
            // push is unsupported on this platform
            self.store.set_messaging_registered(false);
            return Ok(false);
        };

        let token = client.get_token().await?;
        let existing = self.remembered_token();
        let changed = self
            .tokens
            .update_subscription(token.as_deref(), existing.as_deref())
            .await?;
        // Registration is only recorded once the token actually reached the
        // remote document; a signed-out or no-op configuration changes
        // nothing locally either.
        if changed {
            self.remember_token(token.clone());
            self.store.set_messaging_registered(token.is_some());
        }
        Ok(changed)
    }

    /// React to a token refresh event from the push provider
    pub async fn handle_token_refresh(&self) {
        if !self.store.get().has_registered_messaging {
            return;
        }
        // A failure here should just leave messaging disabled for now.
        if let Err(err) = self.configure_messaging_subscription(true).await {
            tracing::error!("[Messaging] token refresh failed to update: {}", err);
        }
    }

    /// Fetch the current delivery token without prompting the user; any
    /// failure maps to `None`
    pub async fn silent_get_token(&self) -> Option<String> {
        let client = self.messaging.load().await.ok()??;
        client.get_token().await.ok().flatten()
    }
}
