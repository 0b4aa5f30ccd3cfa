// error.rs — Error types for the record store.

use thiserror::Error;

/// Errors that can occur while loading or committing tenant records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// A tenant document exists but does not parse.
    #[error("corrupt tenant document {path}: {source}")]
    CorruptDocument {
        path: String,
        source: serde_json::Error,
    },

    /// Failed to serialize/deserialize a tenant document.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
