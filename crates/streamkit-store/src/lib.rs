//! Per-registry JSON configuration documents.
//!
//! Each registry owns one flat document mapping unique id to a record. The
//! document is kept in memory and rewritten on every mutation, so a crash
//! leaves either the previous or the new version on disk.

mod error;
mod paths;

pub use error::StoreError;
pub use paths::{config_dir, default_data_dir, document_path, APP_DIR_NAME, CONFIG_DIR_NAME};

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A flat JSON document persisted at a fixed path.
#[derive(Debug)]
pub struct JsonStore {
    path: PathBuf,
    document: Map<String, Value>,
}

impl JsonStore {
    /// Open the document `name` under `data_dir`, creating the config
    /// directory if needed. A missing file is an empty document.
    pub fn open(data_dir: &Path, name: &str) -> StoreResult<Self> {
        let dir = config_dir(data_dir);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = document_path(data_dir, name);
        let document = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(StoreError::NotAnObject(path)),
                Err(source) => return Err(StoreError::Malformed { path, source }),
            }
        } else {
            Map::new()
        };

        debug!(path = %path.display(), entries = document.len(), "Opened store");
        Ok(Self { path, document })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The whole document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Returns true if the document has an entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.document.contains_key(key)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.document.len()
    }

    /// Returns true if the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.document.is_empty()
    }

    /// Read and decode one entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        self.document
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| StoreError::InvalidEntry {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Decode every entry, in document order.
    pub fn entries<T: DeserializeOwned>(&self) -> StoreResult<Vec<(String, T)>> {
        self.document
            .iter()
            .map(|(key, value)| {
                serde_json::from_value(value.clone())
                    .map(|record| (key.clone(), record))
                    .map_err(|source| StoreError::InvalidEntry {
                        key: key.clone(),
                        source,
                    })
            })
            .collect()
    }

    /// Replace one entry and write the document.
    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        let value = encode(key, value)?;
        let mut next = self.document.clone();
        next.insert(key.to_string(), value);
        self.replace(next)
    }

    /// Set `field` inside the object stored at `key` and write the document.
    /// A missing or non-object entry is replaced by a fresh object.
    pub fn set_field<T: Serialize>(&mut self, key: &str, field: &str, value: &T) -> StoreResult<()> {
        let value = encode(key, value)?;
        let mut next = self.document.clone();
        let entry = next
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert(field.to_string(), value);
        }
        self.replace(next)
    }

    /// Remove one entry. Returns false if it did not exist.
    pub fn delete(&mut self, key: &str) -> StoreResult<bool> {
        if !self.document.contains_key(key) {
            return Ok(false);
        }
        let mut next = self.document.clone();
        next.shift_remove(key);
        self.replace(next)?;
        Ok(true)
    }

    /// Remove `field` from the object stored at `key`. Returns false if it
    /// did not exist.
    pub fn delete_field(&mut self, key: &str, field: &str) -> StoreResult<bool> {
        let mut next = self.document.clone();
        let removed = match next.get_mut(key) {
            Some(Value::Object(fields)) => fields.shift_remove(field).is_some(),
            _ => false,
        };
        if removed {
            self.replace(next)?;
        }
        Ok(removed)
    }

    /// Write `next` to disk and only then make it the in-memory document.
    /// A failed write leaves the previous document in place.
    fn replace(&mut self, next: Map<String, Value>) -> StoreResult<()> {
        self.flush(&next)?;
        self.document = next;
        Ok(())
    }

    fn flush(&self, document: &Map<String, Value>) -> StoreResult<()> {
        let text = serde_json::to_string_pretty(document).map_err(|source| {
            StoreError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> StoreResult<Value> {
    serde_json::to_value(value).map_err(|source| StoreError::InvalidEntry {
        key: key.to_string(),
        source,
    })
}
