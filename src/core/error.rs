//! Error types for the projection engine.
//!
//! Every check runs before the first simulated year, so a run either yields a
//! complete result or one of these.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    /// A global assumption is outside its valid domain.
    #[error("Invalid assumptions: {0}")]
    InvalidAssumptions(String),

    /// An account is malformed or collides with another account.
    #[error("Invalid account `{id}`: {reason}")]
    InvalidAccount { id: String, reason: String },

    /// No accounts were supplied where at least one was expected.
    #[error("At least one account is required")]
    EmptyAccountSet,
}

impl ProjectionError {
    pub(crate) fn account(id: &str, reason: impl Into<String>) -> Self {
        ProjectionError::InvalidAccount {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for `Result<T, ProjectionError>`.
pub type ProjectionResult<T> = Result<T, ProjectionError>;
