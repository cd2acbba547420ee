use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::KeyValueStore;

const TOKEN_KEY: &str = "authToken";
const USER_KEY: &str = "authUser";
const ORGANIZER_ID_KEY: &str = "organizerId";

/// Profile of the logged-in organizer as persisted under `authUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub email: String,
    #[serde(
        rename = "organizer_ID",
        alias = "organizerId",
        alias = "organizer_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub organizer_id: Option<String>,
}

impl AuthUser {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            organizer_id: None,
        }
    }
}

/// Everything persisted for an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub token: String,
    pub user: AuthUser,
    pub organizer_id: Option<String>,
}

impl CredentialRecord {
    pub fn new(token: impl Into<String>, user: AuthUser) -> Self {
        Self {
            token: token.into(),
            user,
            organizer_id: None,
        }
    }

    /// Organizer id from the top-level field, falling back to the profile.
    pub fn organizer_id(&self) -> Option<&str> {
        self.organizer_id
            .as_deref()
            .or(self.user.organizer_id.as_deref())
    }
}

/// Sole writer of the persisted session fields.
/// Clone is cheap - the backend is shared.
#[derive(Clone)]
pub struct CredentialStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Persist a record, overwriting any previous one. No validation.
    pub fn save(&self, record: &CredentialRecord) -> Result<()> {
        let user = serde_json::to_string(&record.user).context("Failed to serialize user")?;
        // Profile first: the token is what makes a record visible to load()
        self.backend.set(USER_KEY, &user)?;
        match record.organizer_id() {
            Some(id) => self.backend.set(ORGANIZER_ID_KEY, id)?,
            None => self.backend.remove(ORGANIZER_ID_KEY)?,
        }
        self.backend.set(TOKEN_KEY, &record.token)?;
        debug!(email = %record.user.email, "Saved credentials");
        Ok(())
    }

    /// The persisted record, or `None` when absent, partial or corrupt.
    pub fn load(&self) -> Option<CredentialRecord> {
        let token = self.read(TOKEN_KEY)?;
        let user_json = self.read(USER_KEY)?;
        let user: AuthUser = match serde_json::from_str(&user_json) {
            Ok(user) => user,
            Err(e) => {
                debug!(error = %e, "Stored user profile is malformed, treating as logged out");
                return None;
            }
        };
        Some(CredentialRecord {
            token,
            user,
            organizer_id: self.read(ORGANIZER_ID_KEY),
        })
    }

    /// Bearer token, if any. Does not require a valid profile.
    pub fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY)
    }

    /// Remove every field. The token goes first so an interrupted clear
    /// never leaves a loadable record behind.
    pub fn clear(&self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove_all(&[USER_KEY, ORGANIZER_ID_KEY])?;
        debug!("Cleared credentials");
        Ok(())
    }

    /// True iff both a token and a well-formed user profile are stored.
    pub fn is_present(&self) -> bool {
        self.load().is_some()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read credential store");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryStore;

    fn store() -> (Arc<MemoryStore>, CredentialStore) {
        let backend = Arc::new(MemoryStore::new());
        let creds = CredentialStore::new(backend.clone());
        (backend, creds)
    }

    #[test]
    fn test_save_load_clear() {
        let (_, creds) = store();
        let record = CredentialRecord::new("abc", AuthUser::new("a@b.com"));

        creds.save(&record).unwrap();
        assert!(creds.is_present());
        assert_eq!(creds.load(), Some(record));

        creds.clear().unwrap();
        assert!(!creds.is_present());
        assert_eq!(creds.load(), None);
        assert_eq!(creds.token(), None);
    }

    #[test]
    fn test_token_alone_is_not_present() {
        let (backend, creds) = store();
        backend.set(TOKEN_KEY, "abc").unwrap();
        assert!(!creds.is_present());
        assert_eq!(creds.token().as_deref(), Some("abc"));
    }

    #[test]
    fn test_user_alone_is_not_present() {
        let (backend, creds) = store();
        backend.set(USER_KEY, r#"{"email":"a@b.com"}"#).unwrap();
        assert!(!creds.is_present());
    }

    #[test]
    fn test_malformed_user_is_absent() {
        let (backend, creds) = store();
        backend.set(TOKEN_KEY, "abc").unwrap();
        backend.set(USER_KEY, "{email: oops").unwrap();
        assert!(!creds.is_present());
        assert_eq!(creds.load(), None);
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let (_, creds) = store();
        let mut first = CredentialRecord::new("one", AuthUser::new("a@b.com"));
        first.organizer_id = Some("1".to_string());
        creds.save(&first).unwrap();

        let second = CredentialRecord::new("two", AuthUser::new("c@d.com"));
        creds.save(&second).unwrap();

        let loaded = creds.load().unwrap();
        assert_eq!(loaded.token, "two");
        assert_eq!(loaded.user.email, "c@d.com");
        assert_eq!(loaded.organizer_id, None);
    }

    #[test]
    fn test_user_profile_accepts_legacy_id_fields() {
        let user: AuthUser =
            serde_json::from_str(r#"{"email":"a@b.com","organizerId":"42"}"#).unwrap();
        assert_eq!(user.organizer_id.as_deref(), Some("42"));

        let user: AuthUser = serde_json::from_str(r#"{"email":"a@b.com"}"#).unwrap();
        assert_eq!(user.organizer_id, None);

        // Serialized under the key the dashboard widgets read
        let json = serde_json::to_string(&AuthUser {
            email: "a@b.com".into(),
            organizer_id: Some("42".into()),
        })
        .unwrap();
        assert!(json.contains("\"organizer_ID\":\"42\""));
    }

    #[test]
    fn test_organizer_id_falls_back_to_profile() {
        let mut user = AuthUser::new("a@b.com");
        user.organizer_id = Some("9".to_string());
        let record = CredentialRecord::new("abc", user);
        assert_eq!(record.organizer_id(), Some("9"));
    }
}
