use thiserror::Error;

/// Failure kinds surfaced by planner operations.
///
/// Every variant except `Unexpected` carries a message that is safe to show
/// to the caller. `Unexpected` wraps storage or infrastructure failures and
/// must be logged, never echoed.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    /// Missing and soft-hidden entities are indistinguishable.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// A required relationship is absent, e.g. assigning a non-member to a project.
    #[error("{0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type PlannerResult<T> = Result<T, PlannerError>;

impl PlannerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
