//! Common test utilities and fixtures
//!
//! Builds a fully wired sync engine over the in-memory document store, plus
//! helpers for seeding remote documents and awaiting state changes.
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use lightsync::loader::CapabilityLoader;
use lightsync::remote::{
    AuthClient, AuthLoader, DocumentStore, DocumentStoreLoader, MemoryDocumentStore,
    MessagingClient, MessagingLoader,
};
use lightsync::shared::{DocumentUpdate, Identity, SyncConfig, SyncError};
use lightsync::store::{AppState, StateStore};
use lightsync::sync::{
    AuthSessionManager, MessagingManager, RemoteDocumentSync, TokenManager, UrlAuditTracker,
};

use chrono::{DateTime, TimeZone, Utc};

static TRACING: Once = Once::new();

/// Route engine tracing through the test writer, honoring `RUST_LOG`
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A fully wired engine over one in-memory document store
pub struct Harness {
    pub config: SyncConfig,
    pub store: StateStore,
    pub memory: MemoryDocumentStore,
    pub session: AuthSessionManager,
    pub sync: RemoteDocumentSync,
    pub audit: UrlAuditTracker,
    pub tokens: TokenManager,
    pub messaging: MessagingManager,
    pub messaging_client: Arc<FakeMessaging>,
}

impl Harness {
    /// Build a harness whose document store loads immediately
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Build a harness whose document store capability does not resolve
    /// until the returned gate is notified
    pub fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let harness = Self::build(Some(gate.clone()));
        (harness, gate)
    }

    fn build(gate: Option<Arc<Notify>>) -> Self {
        init_tracing();
        let config = SyncConfig::builder().build().unwrap();
        let store = StateStore::new();
        let memory = MemoryDocumentStore::new();

        let backing: Arc<dyn DocumentStore> = Arc::new(memory.clone());
        let firestore: DocumentStoreLoader = Arc::new(CapabilityLoader::new(["firestore"], {
            move || {
                let backing = backing.clone();
                let gate = gate.clone();
                async move {
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                    Ok(backing)
                }
            }
        }));

        let auth: AuthLoader = Arc::new(CapabilityLoader::new(["auth"], || async {
            let client: Arc<dyn AuthClient> = Arc::new(NoopAuth);
            Ok(client)
        }));

        let messaging_client = Arc::new(FakeMessaging::new(Some("device-tok")));
        let messaging: MessagingLoader = Arc::new(CapabilityLoader::new(["messaging"], {
            let client = messaging_client.clone();
            move || {
                let client = client.clone();
                async move { Ok(Some(client as Arc<dyn MessagingClient>)) }
            }
        }));

        let audit = UrlAuditTracker::new(config.clone(), store.clone(), firestore.clone());
        let sync = RemoteDocumentSync::new(
            config.clone(),
            store.clone(),
            firestore.clone(),
            audit.clone(),
        );
        let tokens = TokenManager::new(config.clone(), store.clone(), firestore);
        let messaging_manager =
            MessagingManager::new(store.clone(), tokens.clone(), messaging);
        let session = AuthSessionManager::new(store.clone(), sync.clone(), auth);

        Self {
            config,
            store,
            memory,
            session,
            sync,
            audit,
            tokens,
            messaging: messaging_manager,
            messaging_client,
        }
    }

    /// Seed the remote document for `uid` with a current URL and first-seen
    /// time, as another device would
    pub async fn seed_remote(&self, uid: &str, url: &str, seen: DateTime<Utc>) {
        let doc_id = self.config.user_doc_path(uid);
        let url = url.to_string();
        let backing: Arc<dyn DocumentStore> = Arc::new(self.memory.clone());
        backing
            .run_transaction(
                &doc_id,
                Box::new(move |_snapshot| {
                    let mut update = DocumentUpdate {
                        current_url: Some(url.clone()),
                        ..Default::default()
                    };
                    update.set_urls.insert(url.clone(), seen);
                    Ok(update)
                }),
            )
            .await
            .unwrap();
    }
}

/// Wait (with timeout) until the state store satisfies a predicate
pub async fn wait_for_state<F>(store: &StateStore, mut pred: F) -> AppState
where
    F: FnMut(&AppState) -> bool,
{
    let mut rx = store.subscribe();
    let state = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|state| pred(state)))
        .await
        .expect("timed out waiting for state")
        .expect("state store closed");
    state.clone()
}

/// Fixed timestamp helper
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// Auth client that never signs anyone in; integration tests drive
/// `handle_auth_state` directly, the way provider events would
pub struct NoopAuth;

#[async_trait]
impl AuthClient for NoopAuth {
    async fn sign_in(&self) -> Result<Option<Identity>, SyncError> {
        Ok(None)
    }

    async fn sign_out(&self) -> Result<(), SyncError> {
        Ok(())
    }
}

/// Messaging client with a settable device token
pub struct FakeMessaging {
    token: std::sync::Mutex<Option<String>>,
}

impl FakeMessaging {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: std::sync::Mutex::new(token.map(str::to_string)),
        }
    }

    pub fn set_token(&self, token: Option<&str>) {
        *self.token.lock().unwrap() = token.map(str::to_string);
    }
}

#[async_trait]
impl MessagingClient for FakeMessaging {
    async fn get_token(&self) -> Result<Option<String>, SyncError> {
        Ok(self.token.lock().unwrap().clone())
    }
}
