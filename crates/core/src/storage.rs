//! Key-value persistence for carts.
//!
//! [`CartStorage`] is the collaborator a [`CartStore`](crate::CartStore)
//! mirrors its lines into. It is a plain synchronous string store addressed
//! by key, in the spirit of browser local storage. Two adapters ship here:
//!
//! - [`MemoryStorage`] - a `HashMap` with an optional byte quota
//! - [`FileStorage`] - one JSON file per key inside a directory

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by a [`CartStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing would exceed the configured quota.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} allowed")]
    QuotaExceeded {
        /// Bytes the store would hold after the write.
        needed: usize,
        /// Configured limit.
        quota: usize,
    },

    /// The key cannot be used by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// The backend refused the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Filesystem error.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A synchronous string key-value store.
pub trait CartStorage {
    /// Read the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or exceeds a quota.
    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be modified.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<S: CartStorage + ?Sized> CartStorage for &mut S {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).write(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// In-memory storage with an optional quota on total key + value bytes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that refuses writes beyond `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            quota: Some(bytes),
        }
    }

    /// Bytes currently held (keys plus values).
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.entries.iter().map(|(k, v)| k.len() + v.len()).sum()
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CartStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota {
            let replaced = self.entries.get(key).map_or(0, |v| key.len() + v.len());
            let needed = self.used_bytes() - replaced + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }

        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// =============================================================================
// File storage
// =============================================================================

/// Directory-backed storage: the value of `key` lives in `<dir>/<key>.json`.
///
/// Writes go to a hidden temp file that is synced and then renamed over the
/// target, so neither a reader nor a crash leaves a half-written record.
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
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// The storage directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] unless the key is non-empty, does
    /// not start with a dot, and only uses ASCII letters, digits, `-`, `_`
    /// and `.`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }

        Ok(self.dir.join(format!("{key}.json")))
    }
}

/// Write `value` to `path` and flush it to disk before returning.
fn write_synced(path: &Path, value: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()
}

impl CartStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        let result = write_synced(&tmp, value).and_then(|()| fs::rename(&tmp, &path));
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result.map_err(StorageError::from)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("sillage-storage-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_roundtrip() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.read("cart").unwrap(), None);

        storage.write("cart", "[]").unwrap();
        assert_eq!(storage.read("cart").unwrap().as_deref(), Some("[]"));

        storage.remove("cart").unwrap();
        assert_eq!(storage.read("cart").unwrap(), None);
        storage.remove("cart").unwrap();
    }

    #[test]
    fn test_memory_quota() {
        let mut storage = MemoryStorage::with_quota(10);
        storage.write("k", "123456789").unwrap();
        assert_eq!(storage.used_bytes(), 10);

        // Replacing a value only counts the difference
        storage.write("k", "987654321").unwrap();

        let err = storage.write("k", "1234567890").unwrap_err();
        assert!(matches!(
            err,
            StorageError::QuotaExceeded {
                needed: 11,
                quota: 10
            }
        ));
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("987654321"));
    }

    #[test]
    fn test_mut_ref_is_storage() {
        fn write_through(mut storage: impl CartStorage) {
            storage.write("k", "v").unwrap();
        }

        let mut storage = MemoryStorage::new();
        write_through(&mut storage);
        assert_eq!(storage.read("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = temp_dir();
        let mut storage = FileStorage::open(&dir).unwrap();

        assert_eq!(storage.read("sillage-cart").unwrap(), None);
        storage.write("sillage-cart", r#"[{"id":"p1"}]"#).unwrap();
        assert_eq!(
            storage.read("sillage-cart").unwrap().as_deref(),
            Some(r#"[{"id":"p1"}]"#)
        );
        assert!(dir.join("sillage-cart.json").exists());
        assert!(!dir.join(".sillage-cart.json.tmp").exists());

        storage.remove("sillage-cart").unwrap();
        assert_eq!(storage.read("sillage-cart").unwrap(), None);
        storage.remove("sillage-cart").unwrap();

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_file_failed_rename_cleans_up() {
        let dir = temp_dir();
        let mut storage = FileStorage::open(&dir).unwrap();

        // A directory in the way makes the rename fail
        fs::create_dir(dir.join("sillage-cart.json")).unwrap();
        assert!(matches!(
            storage.write("sillage-cart", "[]"),
            Err(StorageError::Io(_))
        ));
        assert!(!dir.join(".sillage-cart.json.tmp").exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_file_rejects_path_keys() {
        let dir = temp_dir();
        let mut storage = FileStorage::open(&dir).unwrap();

        for key in ["", "../escape", "a/b", ".hidden", "a\\b"] {
            assert!(matches!(
                storage.write(key, "x"),
                Err(StorageError::InvalidKey(_))
            ));
        }

        fs::remove_dir_all(dir).unwrap();
    }
}
