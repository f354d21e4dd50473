//! Durable client-side key/value storage.
//!
//! The cart, payment backups and the pending-orders index live in storage owned by one browser
//! profile (or one device). Nothing here is shared across users and there is no cross-process
//! coordination: two writers to the same key simply overwrite each other.

use std::{collections::HashMap, io, sync::Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, de::DeserializeOwned};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Storage is unavailable.")]
    Unavailable,
    #[error("Storage I/O failed for key {key}.")]
    Io { key: String, source: io::Error },
    #[error("Stored value for key {key} could not be (de)serialized.")]
    Serde {
        key: String,
        source: serde_json::Error,
    },
}

pub trait LocalStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// Reads a JSON document stored under `key`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn LocalStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    storage
        .get_item(key)?
        .map(|raw| {
            serde_json::from_str(&raw).map_err(|source| StorageError::Serde {
                key: key.to_owned(),
                source,
            })
        })
        .transpose()
}

/// Writes `value` as a JSON document under `key`.
pub fn write_json<T: Serialize>(
    storage: &dyn LocalStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde {
        key: key.to_owned(),
        source,
    })?;
    storage.set_item(key, &raw)
}

//------------------------- In memory ----------------------------

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    disabled: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every operation, like a browser with storage turned off.
    pub fn disabled() -> Self {
        Self {
            entries: Mutex::default(),
            disabled: true,
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        if self.disabled {
            return Err(StorageError::Unavailable);
        }
        self.entries.lock().map_err(|_| StorageError::Unavailable)
    }
}

impl LocalStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries()?.remove(key);
        Ok(())
    }
}

//---------------------------- Files -----------------------------

/// One file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    directory: Utf8PathBuf,
}

impl FileStorage {
    pub fn new(directory: impl Into<Utf8PathBuf>) -> Result<Self, StorageError> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory).map_err(|source| StorageError::Io {
            key: directory.to_string(),
            source,
        })?;
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Utf8Path {
        &self.directory
    }

    fn path_for(&self, key: &str) -> Utf8PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

impl LocalStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value).map_err(|source| StorageError::Io {
            key: key.to_owned(),
            source,
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_owned(),
                source,
            }),
        }
    }
}

//-------------------------- Tests -------------------------------
