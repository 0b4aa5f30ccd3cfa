// error.rs — Error types for lifecycle, sweep, and extension operations.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use lf_stages::CatalogError;
use lf_store::{ExtensionStatus, StoreError};

/// Caller-facing classification of a [`LifecycleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input.
    Validation,
    /// The edge is not registered, or the lead cannot move at all.
    InvalidTransition,
    NotFound,
    /// The request is well formed but a business rule forbids it.
    PolicyViolation,
    /// The store could not be read or written.
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::InvalidTransition => write!(f, "invalid_transition"),
            ErrorKind::NotFound => write!(f, "not_found"),
            ErrorKind::PolicyViolation => write!(f, "policy_violation"),
            ErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Errors returned synchronously by lifecycle operations.
///
/// None of these leave partial state behind: every operation runs inside a
/// single store transaction that is dropped on error.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("lead not found: {0}")]
    LeadNotFound(Uuid),

    #[error("extension not found: {0}")]
    ExtensionNotFound(Uuid),

    #[error("failure not found: {0}")]
    FailureNotFound(Uuid),

    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    /// A required stage question was left blank.
    #[error("stage '{stage}' requires an answer for '{question}'")]
    MissingAnswer { stage: String, question: String },

    #[error("answer '{question}' for stage '{stage}' is invalid: {reason}")]
    InvalidAnswer {
        stage: String,
        question: String,
        reason: String,
    },

    /// The stage catalog itself is malformed.
    #[error("stage catalog error: {0}")]
    Catalog(String),

    #[error("invalid transition between stages {from} and {to} for lead {lead_id}")]
    InvalidTransition {
        lead_id: Uuid,
        from: String,
        to: String,
    },

    /// The lead was failed by a sweep or a surrender and cannot move.
    #[error("lead {0} has failed and cannot change stage")]
    LeadFailed(Uuid),

    #[error("nothing to undo for lead {0}")]
    NothingToUndo(Uuid),

    #[error("history entry {entry_id} of lead {lead_id} is already undone or is an undo")]
    AlreadyUndone { lead_id: Uuid, entry_id: Uuid },

    /// Malformed extension request, or a blank reason where one is required.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("lead {0} has no active deadline")]
    NoActiveDeadline(Uuid),

    #[error(
        "extension of {requested}h for lead {lead_id} in stage '{stage}' exceeds the {cap}h cap ({committed}h already pending or approved)"
    )]
    CapExceeded {
        lead_id: Uuid,
        stage: String,
        committed: u32,
        requested: u32,
        cap: u32,
    },

    #[error("extension {extension_id} was already {status}")]
    AlreadyDecided {
        extension_id: Uuid,
        status: ExtensionStatus,
    },

    #[error("failure {0} is already resolved")]
    FailureAlreadyResolved(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::UnknownStage(_)
            | LifecycleError::MissingAnswer { .. }
            | LifecycleError::InvalidAnswer { .. }
            | LifecycleError::Catalog(_)
            | LifecycleError::InvalidRequest(_) => ErrorKind::Validation,
            LifecycleError::InvalidTransition { .. } | LifecycleError::LeadFailed(_) => {
                ErrorKind::InvalidTransition
            }
            LifecycleError::LeadNotFound(_)
            | LifecycleError::ExtensionNotFound(_)
            | LifecycleError::FailureNotFound(_) => ErrorKind::NotFound,
            LifecycleError::NothingToUndo(_)
            | LifecycleError::AlreadyUndone { .. }
            | LifecycleError::NoActiveDeadline(_)
            | LifecycleError::CapExceeded { .. }
            | LifecycleError::AlreadyDecided { .. }
            | LifecycleError::FailureAlreadyResolved(_) => ErrorKind::PolicyViolation,
            LifecycleError::Store(_) => ErrorKind::Storage,
        }
    }
}

impl From<CatalogError> for LifecycleError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownStage(code) => LifecycleError::UnknownStage(code),
            CatalogError::MissingAnswer { stage, question } => {
                LifecycleError::MissingAnswer { stage, question }
            }
            CatalogError::InvalidAnswer {
                stage,
                question,
                reason,
            } => LifecycleError::InvalidAnswer {
                stage,
                question,
                reason,
            },
            other @ (CatalogError::DuplicateStage(_) | CatalogError::InvalidOrdering(_)) => {
                LifecycleError::Catalog(other.to_string())
            }
        }
    }
}
