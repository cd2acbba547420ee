//! REST gateway for the exhibition backend.
//!
//! `ApiClient` attaches the stored bearer token to every request and
//! turns 401/403 answers into a session expiry instead of handing the
//! response back to the caller. Other failures are returned as
//! `ApiError` for the calling view to present.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
