//! Data models for the exhibition backend.
//!
//! - `Organizer`, `NewOrganizer`, `OrganizerUpdate`: organizer accounts
//! - `Alert`, `NewAlert`: broadcast alerts
//! - `Building`: exhibit buildings returned by the tag filter
//! - `LoginRequest`, `LoginResponse`: authentication payloads

pub mod alert;
pub mod auth;
pub mod building;
pub mod organizer;

pub use alert::{Alert, NewAlert};
pub use auth::{LoginRequest, LoginResponse, TokenClaims};
pub use building::{Building, EXHIBIT_TAGS};
pub use organizer::{NewOrganizer, Organizer, OrganizerUpdate};
