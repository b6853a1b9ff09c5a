//! Lazy Capability Loader
//!
//! Optional capability modules (document store, auth, messaging) are pulled
//! in on demand. Each [`CapabilityLoader`] covers one capability set: the
//! first `load()` drives the factory, every concurrent or later call joins
//! the same shared future, so there is at most one load per capability.
//!
//! A failed load stays cached - all waiters observe the same
//! [`SyncError::CapabilityLoad`] and no retry is attempted here. Callers
//! decide whether retrying makes sense.

use std::sync::{Mutex, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;

use crate::shared::SyncError;

type LoadFuture<T> = Shared<BoxFuture<'static, Result<T, SyncError>>>;
type Factory<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, SyncError>> + Send + Sync>;

/// Deduplicating lazy loader for one capability set
pub struct CapabilityLoader<T: Clone> {
    capabilities: Vec<String>,
    factory: Factory<T>,
    cell: Mutex<Option<LoadFuture<T>>>,
}

impl<T: Clone + Send + Sync + 'static> CapabilityLoader<T> {
    /// Create a loader for the named capabilities backed by `factory`.
    ///
    /// The factory runs at most once, on the first `load()`.
    pub fn new<I, S, F, Fut>(capabilities: I, factory: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, SyncError>> + Send + 'static,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            factory: Box::new(move || factory().boxed()),
            cell: Mutex::new(None),
        }
    }

    /// Names of the capabilities this loader provides
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Load the capability, joining an in-flight or completed load if one
    /// exists
    pub fn load(&self) -> impl Future<Output = Result<T, SyncError>> {
        let mut cell = self.cell.lock().unwrap_or_else(PoisonError::into_inner);
        cell.get_or_insert_with(|| {
            tracing::debug!("[Loader] loading capabilities {:?}", self.capabilities);
            (self.factory)().shared()
        })
        .clone()
    }

    /// Whether a load has been started (successfully or not)
    pub fn started(&self) -> bool {
        self.cell
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
