//! Errors returned by book operations and wizards.

use thiserror::Error;

use orderlink_core::DomainError;

/// Failure of an application-level operation.
///
/// Domain errors are mapped variant by variant so callers can tell a blocking
/// user message (`Validation`) from a programming or data error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Blocking, user-visible failure. No state was changed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Stale version or duplicate creation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The named document does not exist in the company.
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl ServiceError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvariantViolation(msg) => ServiceError::InvariantViolation(msg),
            DomainError::Conflict(msg) => ServiceError::Conflict(msg),
            DomainError::NotFound => ServiceError::NotFound("record".to_string()),
            DomainError::InvalidId(msg) => ServiceError::InvalidId(msg),
        }
    }
}
