//! File-backed key-value storage.
//!
//! All keys live in one JSON object file, written with the stable
//! serializer after every change:
//! ```json
//! {
//!   "warden.user-1.info": "{\"expiration\":null,\"data\":{...}}"
//! }
//! ```
//! The default location is the platform config directory:
//! - Linux/macOS: ~/.config/warden/<name>.json
//! - Windows: %APPDATA%/warden/<name>.json

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use warden_application::ports::KeyValueStore;
use warden_domain::{AuthError, AuthResult};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

/// Storage persisted to a single JSON file.
///
/// The file is read once on open and rewritten on every mutation. An
/// unreadable or unparseable file opens as empty; the next write replaces it.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Opens the storage file at `path`. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> AuthResult<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => from_json_bytes(&bytes).unwrap_or_else(|error| {
                tracing::warn!(path = %path.display(), %error, "storage file unparseable, starting empty");
                BTreeMap::new()
            }),
            Err(error) if error.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(io_error(&path, &error)),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Opens `<config dir>/warden/<name>.json`.
    ///
    /// # Errors
    ///
    /// Returns a storage error if no config directory is known for this
    /// platform or the file cannot be read.
    pub fn in_config_dir(name: &str) -> AuthResult<Self> {
        let path = Self::default_path(name)
            .ok_or_else(|| AuthError::storage("could not determine config directory"))?;
        Self::open(path)
    }

    /// Default location of the storage file called `name`.
    #[must_use]
    pub fn default_path(name: &str) -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("warden").join(format!("{name}.json")))
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Applies `change` to a copy, and keeps it only once it is on disk.
    fn mutate<F>(&self, change: F) -> AuthResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = entries.clone();
        change(&mut next);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }
        let content = to_json_stable_bytes(entries)?;
        fs::write(&self.path, content).map_err(|e| io_error(&self.path, &e))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
    }

    fn clear(&self) -> AuthResult<()> {
        self.mutate(BTreeMap::clear)
    }
}

fn io_error(path: &Path, error: &io::Error) -> AuthError {
    AuthError::storage(format!("{}: {error}", path.display()))
}
