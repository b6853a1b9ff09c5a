//! Remote User Document Model
//!
//! This module defines the schema of the per-user remote document and the
//! merge-write payload used by transactions against it.
//!
//! The remote document looks like:
//!
//! ```text
//! {
//!   currentUrl: String,          # URL currently under audit
//!   urls: {String: Timestamp},   # URL to first time seen (earliest wins)
//!   tokens: {String: Timestamp}, # delivery token to last time used
//!   subscription: Timestamp,     # present iff the user has any tokens
//! }
//! ```
//!
//! Every field is optional on the wire: a brand new user has no document at
//! all, and a partially written one may miss any subset. Presence is always
//! checked explicitly rather than through default-value truthiness.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The per-user remote document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    /// URL currently under audit for this user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_url: Option<String>,

    /// First-seen time per URL ever set as current
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub urls: BTreeMap<String, DateTime<Utc>>,

    /// Notification delivery token to last-active time
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tokens: BTreeMap<String, DateTime<Utc>>,

    /// Present iff the user has at least one active token; indexable
    /// "has subscription" marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<DateTime<Utc>>,
}

impl UserDocument {
    /// Whether the subscription marker is present
    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }
}

/// A pushed, versioned copy of a remote document delivered to subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Path of the document this snapshot belongs to
    pub doc_id: String,
    /// Document contents; `None` when the document has never been written
    pub contents: Option<UserDocument>,
}

impl Snapshot {
    /// Create a new snapshot
    pub fn new(doc_id: impl Into<String>, contents: Option<UserDocument>) -> Self {
        Self {
            doc_id: doc_id.into(),
            contents,
        }
    }

    /// Whether the document existed at the time of this snapshot
    pub fn exists(&self) -> bool {
        self.contents.is_some()
    }

    /// Document contents, defaulting to an empty document for a new user
    pub fn data(&self) -> UserDocument {
        self.contents.clone().unwrap_or_default()
    }
}

/// A single-field write inside a merge update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWrite<T> {
    /// Set the field to the given value
    Set(T),
    /// Remove the field outright, so presence-based queries stay correct
    Delete,
}

/// Merge-write payload: only the fields named here are touched, everything
/// else in the document is preserved
#[derive(Debug, Clone, Default)]
pub struct DocumentUpdate {
    /// Replace `currentUrl`
    pub current_url: Option<String>,
    /// Upsert entries into `urls`
    pub set_urls: BTreeMap<String, DateTime<Utc>>,
    /// Upsert entries into `tokens`
    pub set_tokens: BTreeMap<String, DateTime<Utc>>,
    /// Remove entries from `tokens`
    pub remove_tokens: BTreeSet<String>,
    /// Set or delete the `subscription` marker
    pub subscription: Option<FieldWrite<DateTime<Utc>>>,
}

impl DocumentUpdate {
    /// Whether this update writes anything at all
    pub fn is_empty(&self) -> bool {
        self.current_url.is_none()
            && self.set_urls.is_empty()
            && self.set_tokens.is_empty()
            && self.remove_tokens.is_empty()
            && self.subscription.is_none()
    }

    /// Apply this update to a document, merge-write style
    pub fn apply(&self, doc: &mut UserDocument) {
        if let Some(url) = &self.current_url {
            doc.current_url = Some(url.clone());
        }
        for (url, seen) in &self.set_urls {
            doc.urls.insert(url.clone(), *seen);
        }
        for token in &self.remove_tokens {
            doc.tokens.remove(token);
        }
        for (token, active) in &self.set_tokens {
            doc.tokens.insert(token.clone(), *active);
        }
        match self.subscription {
            Some(FieldWrite::Set(at)) => doc.subscription = Some(at),
            Some(FieldWrite::Delete) => doc.subscription = None,
            None => {}
        }
    }
}
