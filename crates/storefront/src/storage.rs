//! Client-local key/value storage.
//!
//! Plays the role a browser's `localStorage` plays for a web front-end: a
//! flat namespace of string keys holding JSON documents, read synchronously
//! on startup and rewritten on every change.
//!
//! - [`FileStorage`] keeps one `<key>.json` file per key in the data
//!   directory and replaces files atomically: each write goes to its own
//!   uniquely named temp file in the same directory, which is then renamed
//!   over the target.
//! - [`MemoryStorage`] keeps everything in a map; used by tests and for
//!   throwaway sessions.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors from the client-local store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error for key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored document could not be encoded or decoded.
    #[error("storage serialization error for key '{key}': {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The key contains characters that are not allowed in a file name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// Raw string storage.
pub trait Storage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be modified.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Typed JSON helpers over any [`Storage`].
pub trait StorageExt: Storage {
    /// Read and decode the JSON document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or the document does not
    /// decode as `T`.
    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        self.get_raw(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|source| StorageError::Serde {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde {
            key: key.to_string(),
            source,
        })?;
        self.set_raw(key, &raw)
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}

// =============================================================================
// FileStorage
// =============================================================================

/// Directory-backed storage: one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (and create if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The directory holding the key files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl Storage for FileStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let io_err = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };

        // Same directory as the target so the rename never crosses filesystems.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value.as_bytes()).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage. Contents are lost when dropped.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();

        assert_eq!(storage.load::<Vec<u32>>("cart").unwrap(), None);

        storage.save("cart", &vec![1_u32, 2, 3]).unwrap();
        assert_eq!(storage.load::<Vec<u32>>("cart").unwrap(), Some(vec![1, 2, 3]));
        assert!(storage.dir().join("cart.json").exists());

        storage.remove("cart").unwrap();
        storage.remove("cart").unwrap();
        assert_eq!(storage.get_raw("cart").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::open(dir.path())
            .unwrap()
            .set_raw("user", "{\"id\":1}")
            .unwrap();

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(reopened.get_raw("user").unwrap().as_deref(), Some("{\"id\":1}"));
    }

    #[test]
    fn test_file_storage_concurrent_writes_to_one_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        for round in 0..200 {
            let first = format!("[{round},1]");
            let second = format!("[{round},2]");
            std::thread::scope(|s| {
                let a = s.spawn(|| storage.set_raw("cart", &first));
                let b = s.spawn(|| storage.set_raw("cart", &second));
                a.join().unwrap().unwrap();
                b.join().unwrap().unwrap();
            });

            let stored = storage.get_raw("cart").unwrap().unwrap();
            assert!(stored == first || stored == second, "unexpected content {stored}");
        }

        // No temp files are left behind next to the key file.
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "cart.json")
            .collect();
        assert!(leftovers.is_empty(), "stray files: {leftovers:?}");
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(matches!(
            storage.set_raw("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.get_raw("").is_err());
    }

    #[test]
    fn test_load_reports_corrupt_documents() {
        let storage = MemoryStorage::new();
        storage.set_raw("cart", "not json").unwrap();
        assert!(matches!(
            storage.load::<Vec<u32>>("cart"),
            Err(StorageError::Serde { .. })
        ));
    }
}
