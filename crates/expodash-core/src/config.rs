//! Application configuration management.
//!
//! Configuration lives at `~/.config/expodash/config.json`. Every field
//! has a default, so a missing file (or a partial one) is fine.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::auth::timer::MAX_TIMEOUT;
use crate::auth::{FileStore, KeyValueStore, KeyringStore, MemoryStore};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "expodash";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_ALERTS_BASE_URL: &str = "http://localhost:3001";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Inactivity timeout. 15 minutes.
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 900;

const DEFAULT_WARNING_MESSAGE: &str =
    "Are You Still There? Your session will expire soon due to inactivity.";

/// Where credentials are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity before the session is ended
    pub timeout_seconds: u64,
    /// Whether to tell the user when an inactivity logout happens
    pub show_warning: bool,
    pub warning_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_SESSION_TIMEOUT_SECS,
            show_warning: true,
            warning_message: DEFAULT_WARNING_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    /// Alerts are served by a separate backend
    pub alerts_base_url: String,
    pub request_timeout_secs: u64,
    pub store: StoreBackend,
    pub session: SessionConfig,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            alerts_base_url: DEFAULT_ALERTS_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            store: StoreBackend::default(),
            session: SessionConfig::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject settings the session core cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.session.timeout_seconds == 0 {
            bail!("session.timeout_seconds must be a positive number of seconds");
        }
        if self.session.timeout_seconds > MAX_TIMEOUT.as_secs() {
            bail!(
                "session.timeout_seconds must be at most {} seconds",
                MAX_TIMEOUT.as_secs()
            );
        }
        if self.api_base_url.trim().is_empty() {
            bail!("api_base_url must not be empty");
        }
        if self.alerts_base_url.trim().is_empty() {
            bail!("alerts_base_url must not be empty");
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Open the configured credential backend.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let store: Arc<dyn KeyValueStore> = match self.store {
            StoreBackend::File => Arc::new(FileStore::new(self.cache_dir()?)),
            StoreBackend::Keyring => Arc::new(KeyringStore::new()),
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
        };
        Ok(store)
    }
}
