// error.rs — Error types for event delivery and ledger writes.

use thiserror::Error;

/// Errors raised by notifiers, delivery sinks, and ledgers.
///
/// The dispatcher logs these; they never reach the caller of a lifecycle
/// or goal operation.
#[derive(Debug, Error)]
pub enum EventError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    /// Failed to serialize an event, delivery, or ledger entry.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A delivery transport refused the notification.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The ledger refused the entry.
    #[error("ledger write failed: {0}")]
    LedgerFailed(String),
}
