// error.rs — Error types for goal planning and evaluation.

use thiserror::Error;
use uuid::Uuid;

use lf_store::StoreError;

#[derive(Debug, Error)]
pub enum GoalError {
    #[error("goal plan not found: {0}")]
    PlanNotFound(Uuid),

    #[error("goal target not found: {0}")]
    TargetNotFound(Uuid),

    #[error("user not found: {0}")]
    UserNotFound(Uuid),

    #[error("team not found: {0}")]
    TeamNotFound(Uuid),

    /// A plan window or target value that can never be evaluated.
    #[error("invalid goal definition: {0}")]
    InvalidDefinition(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
