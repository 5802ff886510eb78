use std::path::PathBuf;

use thiserror::Error;

pub mod kv;
pub mod local;
pub mod portable;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to read '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

/// Flat key-value persistence. Every operation may fail; callers fall
/// back to defaults on read failures and degrade gracefully on write
/// failures instead of crashing.
pub trait KeyValue {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
