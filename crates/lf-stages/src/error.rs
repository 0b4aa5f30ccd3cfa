// error.rs — Error types for the stage catalog.

use thiserror::Error;

/// Errors raised while building a catalog or validating stage answers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// No stage with this code exists in the catalog.
    #[error("unknown stage '{0}'")]
    UnknownStage(String),

    /// Two stages share a code.
    #[error("duplicate stage code '{0}'")]
    DuplicateStage(String),

    /// The stages do not form one linear run ending in a single terminal stage.
    #[error("invalid stage ordering: {0}")]
    InvalidOrdering(String),

    /// A required question on the target stage has no (or an empty) answer.
    #[error("stage '{stage}' requires an answer for '{question}'")]
    MissingAnswer { stage: String, question: String },

    /// An answer is present but has the wrong shape for its question.
    #[error("answer '{question}' for stage '{stage}' is invalid: {reason}")]
    InvalidAnswer {
        stage: String,
        question: String,
        reason: String,
    },
}
