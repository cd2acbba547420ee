//! Core library for the expodash organizer dashboard.
//!
//! - [`auth`]: credential persistence, the inactivity timer and the
//!   session lifecycle manager that owns the exactly-once expiry guard
//! - [`api`]: the REST gateway that attaches bearer tokens and routes
//!   401/403 responses into the session manager
//! - [`models`]: organizer, alert and building payloads
//! - [`config`]: on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{
    ActivityKind, CredentialRecord, CredentialStore, ExpirationReason, Notifier, SessionBinding,
    SessionError, SessionManager, SessionState,
};
pub use config::{Config, SessionConfig, StoreBackend};
