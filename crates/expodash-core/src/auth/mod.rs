//! Authentication module for managing the organizer session.
//!
//! This module provides:
//! - `CredentialStore`: token and profile persistence over a `KeyValueStore`
//! - `InactivityTimer`: restartable single-shot countdown
//! - `SessionManager`: login/logout lifecycle with an exactly-once
//!   expiration guard
//!
//! A session ends either when the user is idle for the configured
//! timeout or when the backend rejects the bearer token.

pub mod credentials;
pub mod session;
pub mod store;
pub mod timer;

pub use credentials::{AuthUser, CredentialRecord, CredentialStore};
pub use session::{
    ActivityKind, ExpirationReason, Notifier, SessionBinding, SessionError, SessionManager,
    SessionState, SESSION_EXPIRED_MESSAGE,
};
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
pub use timer::InactivityTimer;
