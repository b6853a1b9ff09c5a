//! Signed-in identity
//!
//! The identity handed to the engine by the external auth provider. Only the
//! `uid` participates in sync (it keys the remote user document); the other
//! fields are carried for display purposes.

use serde::{Deserialize, Serialize};

/// A signed-in user as reported by the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user id, keys the remote user document
    pub uid: String,
    /// Email address, if the provider shared one
    pub email: Option<String>,
    /// Display name, if the provider shared one
    pub display_name: Option<String>,
}

impl Identity {
    /// Create a new identity with just a uid
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }
}
