//! Client/Remote Sync Engine
//!
//! The components that keep local application state and the per-user remote
//! document reconciled across devices, tabs, and sign-in transitions.
//!
//! # Architecture
//!
//! - **`session`** - auth transitions drive the subscription lifecycle
//! - **`reconcile`** - one live listener per signed-in session, snapshot
//!   precedence rules, guarded cancellation
//! - **`audit`** - transactional `currentUrl` / first-seen-time writes
//! - **`messaging`** - transactional token set maintenance and the derived
//!   subscription marker
//!
//! The components never call each other directly except along the arrows
//! above; everything else coordinates through [`crate::store::StateStore`]
//! fields and the remote document itself.

/// URL audit tracking transactions
pub mod audit;

/// Token and subscription-marker transactions
pub mod messaging;

/// Snapshot reconciliation and subscription lifecycle
pub mod reconcile;

/// Auth transition handling
pub mod session;

/// Re-export commonly used types for convenience
pub use audit::UrlAuditTracker;
pub use messaging::{MessagingManager, TokenManager};
pub use reconcile::RemoteDocumentSync;
pub use session::AuthSessionManager;
