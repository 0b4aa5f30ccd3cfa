// error.rs — Error type for the engine facade.

use thiserror::Error;
use uuid::Uuid;

use lf_goals::GoalError;
use lf_lifecycle::{ErrorKind, LifecycleError};
use lf_store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    ConfigError {
        path: String,
        source: toml::de::Error,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{entity} {id} was already decided")]
    AlreadyDecided { entity: &'static str, id: Uuid },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Goal(#[from] GoalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Lifecycle(e) => e.kind(),
            EngineError::Goal(
                GoalError::PlanNotFound(_)
                | GoalError::TargetNotFound(_)
                | GoalError::UserNotFound(_)
                | GoalError::TeamNotFound(_),
            )
            | EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::Goal(GoalError::InvalidDefinition(_))
            | EngineError::InvalidInput(_)
            | EngineError::ConfigError { .. } => ErrorKind::Validation,
            EngineError::AlreadyDecided { .. } => ErrorKind::PolicyViolation,
            EngineError::Goal(GoalError::Store(_)) | EngineError::Store(_) | EngineError::IoError { .. } => {
                ErrorKind::Storage
            }
        }
    }
}
