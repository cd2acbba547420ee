//! Key-value backends for persisted session data.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::{debug, warn};

/// Keychain service name for `KeyringStore` entries
const SERVICE_NAME: &str = "expodash";

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// A flat string-to-string store, shared by every component that reads
/// session data.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove several keys. Backends that can drop them in one write
    /// should override this.
    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut entries = lock(&self.entries);
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON object file in the cache directory. Every mutation rewrites the
/// whole file, so a multi-key removal lands in a single write.
pub struct FileStore {
    cache_dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            write_lock: Mutex::new(()),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    /// Read the whole map. A corrupt file reads as empty so a damaged
    /// session degrades to "logged out".
    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        match serde_json::from_str(&contents) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Ignoring corrupt session file");
                Ok(BTreeMap::new())
            }
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let path = self.session_path();
        if map.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(map)?;
        // Write then rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace session file")?;
        Ok(())
    }

    fn update<F: FnOnce(&mut BTreeMap<String, String>)>(&self, f: F) -> Result<()> {
        let _guard = lock(&self.write_lock);
        let mut map = self.read_map()?;
        f(&mut map);
        self.write_map(&map)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|map| {
            map.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|map| {
            map.remove(key);
        })
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        self.update(|map| {
            for key in keys {
                map.remove(*key);
            }
        })
    }
}

/// OS keychain, one entry per key.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve value from keychain"),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "Removed keychain entry");
                Ok(())
            }
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}
