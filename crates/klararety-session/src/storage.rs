//! Persistence backends for session entries.
//!
//! A session is persisted as two entries, [`AUTH_TOKEN_KEY`] and [`USER_KEY`],
//! that carry the same attributes a browser cookie would: an absolute expiry,
//! a same-site policy and a secure flag. Backends store entries verbatim and
//! never interpret them; expiry is enforced by the
//! [`SessionStore`](crate::SessionStore).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use jiff::Timestamp;
use klararety_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_STORAGE;

/// Entry holding the opaque bearer token.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

/// Entry holding the JSON-serialized user snapshot.
pub const USER_KEY: &str = "user";

/// Cross-site policy attached to a stored entry.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

/// A persisted value with cookie-style attributes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub value: String,
    pub expires_at: Timestamp,
    #[serde(default)]
    pub same_site: SameSite,
    #[serde(default)]
    pub secure: bool,
}

impl StoredEntry {
    /// Returns `true` if the entry expired at or before `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

impl fmt::Debug for StoredEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredEntry")
            .field("expires_at", &self.expires_at)
            .field("same_site", &self.same_site)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

/// Key-value backend for session entries.
///
/// `write` applies all entries of one call as a unit: a reader never observes
/// only part of a batch.
pub trait SessionStorage: Send + Sync + fmt::Debug {
    /// Reads one entry.
    fn read(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Inserts or replaces every entry of the batch.
    fn write(&self, entries: &[(&str, StoredEntry)]) -> Result<()>;

    /// Removes the given keys; missing keys are ignored.
    fn remove(&self, keys: &[&str]) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, StoredEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn write(&self, entries: &[(&str, StoredEntry)]) -> Result<()> {
        let mut map = lock(&self.entries);
        for (key, entry) in entries {
            map.insert((*key).to_owned(), entry.clone());
        }
        Ok(())
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let mut map = lock(&self.entries);
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}

/// Storage backed by a single JSON file.
///
/// Every mutation rewrites the file through a temporary sibling and an atomic
/// rename. On Unix the file is created with mode `0600`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    /// Creates a storage that persists to `path`. The file is created lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, StoredEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(err) => {
                return Err(Error::storage()
                    .with_message(format!("failed to read {}", self.path.display()))
                    .with_source(err));
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(map) => Ok(map),
            Err(err) => {
                // A corrupt file is equivalent to no session at all.
                tracing::warn!(
                    target: TRACING_TARGET_STORAGE,
                    path = %self.path.display(),
                    error = %err,
                    "Discarding unreadable session file"
                );
                Ok(HashMap::new())
            }
        }
    }

    fn save(&self, map: &HashMap<String, StoredEntry>) -> Result<()> {
        let storage_error = |action: &str, err: std::io::Error| {
            Error::storage()
                .with_message(format!("failed to {action} {}", self.path.display()))
                .with_source(err)
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error("create directory for", e))?;
        }

        let bytes = serde_json::to_vec_pretty(map)?;
        let tmp = self.path.with_extension("tmp");

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&tmp).map_err(|e| storage_error("open", e))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| storage_error("write", e))?;
        fs::rename(&tmp, &self.path).map_err(|e| storage_error("replace", e))?;

        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<StoredEntry>> {
        let _guard = lock(&self.guard);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, entries: &[(&str, StoredEntry)]) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut map = self.load()?;
        for (key, entry) in entries {
            map.insert((*key).to_owned(), entry.clone());
        }
        self.save(&map)
    }

    fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = lock(&self.guard);
        let mut map = self.load()?;
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.save(&map)
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;

    use super::*;

    fn entry(value: &str) -> StoredEntry {
        StoredEntry {
            value: value.to_owned(),
            expires_at: Timestamp::now() + SignedDuration::from_secs(60),
            same_site: SameSite::Strict,
            secure: true,
        }
    }

    #[test]
    fn test_memory_storage_batch_write_and_remove() {
        let storage = MemoryStorage::new();
        storage
            .write(&[(AUTH_TOKEN_KEY, entry("t")), (USER_KEY, entry("u"))])
            .unwrap();

        assert_eq!(storage.read(AUTH_TOKEN_KEY).unwrap().unwrap().value, "t");
        assert_eq!(storage.read(USER_KEY).unwrap().unwrap().value, "u");

        storage.remove(&[AUTH_TOKEN_KEY, USER_KEY, "missing"]).unwrap();
        assert!(storage.read(AUTH_TOKEN_KEY).unwrap().is_none());
        assert!(storage.read(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        FileStorage::new(&path)
            .write(&[(AUTH_TOKEN_KEY, entry("t")), (USER_KEY, entry("u"))])
            .unwrap();

        let reopened = FileStorage::new(&path);
        let token = reopened.read(AUTH_TOKEN_KEY).unwrap().unwrap();
        assert_eq!(token.value, "t");
        assert_eq!(token.same_site, SameSite::Strict);
        assert!(token.secure);

        reopened.remove(&[AUTH_TOKEN_KEY]).unwrap();
        assert!(FileStorage::new(&path).read(AUTH_TOKEN_KEY).unwrap().is_none());
        assert!(FileStorage::new(&path).read(USER_KEY).unwrap().is_some());
    }

    #[test]
    fn test_file_storage_treats_corrupt_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, b"{not json").unwrap();

        let storage = FileStorage::new(&path);
        assert!(storage.read(USER_KEY).unwrap().is_none());

        storage.write(&[(USER_KEY, entry("u"))]).unwrap();
        assert_eq!(storage.read(USER_KEY).unwrap().unwrap().value, "u");
    }

    #[test]
    fn test_file_storage_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("absent.json"));
        assert!(storage.read(AUTH_TOKEN_KEY).unwrap().is_none());
        storage.remove(&[AUTH_TOKEN_KEY]).unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_entry_debug_hides_value() {
        assert!(!format!("{:?}", entry("secret")).contains("secret"));
    }
}
