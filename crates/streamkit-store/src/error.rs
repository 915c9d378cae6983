//! Error types for the configuration store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing a store document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document on disk is not valid JSON.
    #[error("Malformed store document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The document on disk is JSON but not an object.
    #[error("Store document {0} is not a JSON object")]
    NotAnObject(PathBuf),

    /// An entry could not be converted to or from its record type.
    #[error("Invalid store entry {key}: {source}")]
    InvalidEntry {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
