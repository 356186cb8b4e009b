//! Secret storage for Plaid tokens.
//!
//! Tokens live in a single owner-only JSON file next to the connection list.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::infrastructure::traits::FileSystem;

/// Key under which the access token of a Plaid item is stored.
pub fn access_token_key(item_id: &str) -> String {
    format!("access_token:{item_id}")
}

/// Key under which the most recent link token for a user is stored.
pub fn link_token_key(email: &str) -> String {
    format!("link_token:{email}")
}

/// Key/value store for sensitive values.
pub trait SecretStore: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove a secret. Returns `false` if it did not exist.
    fn delete(&self, key: &str) -> io::Result<bool>;
}

/// Secret store backed by a private JSON file.
pub struct FileSecretStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileSecretStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self {
            fs,
            path,
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> io::Result<BTreeMap<String, String>> {
        if !self.fs.exists(&self.path) {
            return Ok(BTreeMap::new());
        }
        let content = self.fs.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("parse {}: {}", self.path.display(), e),
            )
        })
    }

    fn write_all(&self, secrets: &BTreeMap<String, String>) -> io::Result<()> {
        let content = serde_json::to_string_pretty(secrets)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.fs.write_private(&self.path, &content)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let _guard = self.lock();
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let _guard = self.lock();
        debug!("secret set: {}", key);
        let mut secrets = self.read_all()?;
        secrets.insert(key.to_string(), value.to_string());
        self.write_all(&secrets)
    }

    fn delete(&self, key: &str) -> io::Result<bool> {
        let _guard = self.lock();
        let mut secrets = self.read_all()?;
        if secrets.remove(key).is_none() {
            return Ok(false);
        }
        debug!("secret deleted: {}", key);
        self.write_all(&secrets)?;
        Ok(true)
    }
}
