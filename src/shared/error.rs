//! Shared Error Types
//!
//! This module defines the failure taxonomy for the sync engine. Every
//! variant is local-recoverable: the engine always degrades to a usable
//! local-only mode (audits run, URLs are tracked, just not synced or
//! notified), so nothing here is ever fatal to the process.
//!
//! # Error Categories
//!
//! - `CapabilityLoad` - an optional capability module failed to load
//! - `Transaction` - a remote read-modify-write failed (network, contention,
//!   permission)
//! - `Subscription` - listener attachment to the remote document failed
//! - `Auth` - sign-in or sign-out was rejected by the auth provider
//!
//! # Usage
//!
//! ```rust
//! use lightsync::shared::error::SyncError;
//!
//! let error = SyncError::transaction("write conflict on user document");
//! ```
//!
//! # Thread Safety
//!
//! All error types are `Send + Sync + Clone`. Cloning matters: a failed
//! capability load is cached and the same error is handed to every waiter
//! of the shared load future.
use thiserror::Error;

/// Errors surfaced by the sync engine and its remote boundaries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// An optional capability module failed to load
    #[error("capability '{capability}' failed to load: {message}")]
    CapabilityLoad {
        /// Name of the capability that failed (e.g. "firestore")
        capability: String,
        /// Human-readable error message
        message: String,
    },

    /// A transactional read-modify-write against the remote document failed
    #[error("transaction failed: {message}")]
    Transaction {
        /// Human-readable error message
        message: String,
    },

    /// A live subscription to the remote document could not be established
    #[error("subscription failed: {message}")]
    Subscription {
        /// Human-readable error message
        message: String,
    },

    /// The auth provider rejected a sign-in or sign-out request
    #[error("auth failed: {message}")]
    Auth {
        /// Human-readable error message
        message: String,
    },
}

impl SyncError {
    /// Create a new capability load error
    pub fn capability_load(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityLoad {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Create a new transaction error
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            message: message.into(),
        }
    }

    /// Create a new subscription error
    pub fn subscription(message: impl Into<String>) -> Self {
        Self::Subscription {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_load_error() {
        let error = SyncError::capability_load("messaging", "network unreachable");
        match error {
            SyncError::CapabilityLoad {
                capability,
                message,
            } => {
                assert_eq!(capability, "messaging");
                assert_eq!(message, "network unreachable");
            }
            _ => panic!("Expected CapabilityLoad"),
        }
    }

    #[test]
    fn test_transaction_error() {
        let error = SyncError::transaction("write conflict");
        match error {
            SyncError::Transaction { message } => assert_eq!(message, "write conflict"),
            _ => panic!("Expected Transaction"),
        }
    }

    #[test]
    fn test_error_display() {
        let error = SyncError::subscription("listener rejected");
        let display = format!("{}", error);
        assert!(display.contains("subscription failed"));
        assert!(display.contains("listener rejected"));
    }

    #[test]
    fn test_error_clone() {
        let error = SyncError::auth("popup closed");
        let cloned = error.clone();
        assert_eq!(error, cloned);
    }
}
