//! JSON persistence for connections and user credentials

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{Connection, ConnectionRegistry, UserCredentials};
use crate::infrastructure::traits::FileSystem;

fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> ApplicationResult<Option<T>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    let content = fs.read_to_string(path).with_path_context("read", path)?;
    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("cannot parse {}: {}", path.display(), e);
            Err(ApplicationError::CorruptFile(path.to_path_buf()))
        }
    }
}

fn write_json<T: Serialize + ?Sized>(fs: &dyn FileSystem, path: &Path, value: &T) -> ApplicationResult<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| ApplicationError::OperationFailed {
        context: format!("serialize {}", path.display()),
        source: Box::new(e),
    })?;
    fs.write_atomic(path, &content).with_path_context("write", path)
}

/// Connection list stored as a JSON array.
pub struct ConnectionStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl ConnectionStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all connections. A missing or unreadable file yields an empty registry.
    pub fn load(&self) -> ApplicationResult<ConnectionRegistry> {
        match read_json::<Vec<Connection>>(self.fs.as_ref(), &self.path) {
            Ok(Some(connections)) => {
                debug!("loaded {} connections from {}", connections.len(), self.path.display());
                Ok(ConnectionRegistry::new(connections))
            }
            Ok(None) => Ok(ConnectionRegistry::default()),
            Err(ApplicationError::CorruptFile(path)) => {
                warn!("treating {} as empty", path.display());
                Ok(ConnectionRegistry::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, registry: &ConnectionRegistry) -> ApplicationResult<()> {
        debug!("saving {} connections to {}", registry.len(), self.path.display());
        write_json(self.fs.as_ref(), &self.path, registry.as_slice())
    }
}

/// User credentials stored as a JSON object.
pub struct CredentialStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(fs: Arc<dyn FileSystem>, path: PathBuf) -> Self {
        Self { fs, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored credentials, `None` if missing or incomplete.
    ///
    /// A corrupt file is reported as `CorruptFile` so callers can tell it apart
    /// from "never set up".
    pub fn load(&self) -> ApplicationResult<Option<UserCredentials>> {
        let value = match read_json::<serde_json::Value>(self.fs.as_ref(), &self.path)? {
            Some(v) => v,
            None => return Ok(None),
        };
        let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);
        match (field("email"), field("phone")) {
            (Some(email), Some(phone)) => Ok(Some(UserCredentials { email, phone })),
            _ => Ok(None),
        }
    }

    pub fn save(&self, credentials: &UserCredentials) -> ApplicationResult<()> {
        debug!("saving credentials to {}", self.path.display());
        write_json(self.fs.as_ref(), &self.path, credentials)
    }
}
