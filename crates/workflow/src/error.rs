//! Workflow errors
//!
//! The caller-facing taxonomy. Store failures are sorted on the way in:
//! missing records become `NotFound`, busy/timeout failures become
//! `TransientStore`, the rest stay wrapped in `Store`.

use taskpay_core::{AmountError, StatusTransitionError};
use taskpay_ledger::LedgerError;
use taskpay_store::StoreError;
use thiserror::Error;

/// Errors from workflow operations
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Malformed input; shown to the user, never retried
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The record moved on under us ("already reviewed", "task full")
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Store unavailable or busy; safe to retry with backoff
    #[error("Store temporarily unavailable: {0}")]
    TransientStore(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Result type alias for WorkflowError
pub type WorkflowResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    /// Only transient store failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::AlreadyExists { entity, id } => {
                Self::Conflict(format!("{} already exists: {}", entity, id))
            }
            err if err.is_transient() => Self::TransientStore(err.to_string()),
            err => Self::Store(err),
        }
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::from(err).into()
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(err: LedgerError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<AmountError> for WorkflowError {
    fn from(err: AmountError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StatusTransitionError> for WorkflowError {
    fn from(err: StatusTransitionError) -> Self {
        Self::Conflict(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpay_core::AccountStatus;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err: WorkflowError = StoreError::not_found("Task", "TSK-1").into();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Task not found: TSK-1");
    }

    #[test]
    fn test_pool_timeout_is_retryable() {
        let err: WorkflowError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_retryable());

        let err: WorkflowError = StoreError::InvalidDecimal("x".to_string()).into();
        assert!(!err.is_retryable());
        assert!(matches!(err, WorkflowError::Store(_)));
    }

    #[test]
    fn test_transition_error_is_conflict() {
        let err: WorkflowError = StatusTransitionError {
            from: AccountStatus::Banned,
            to: AccountStatus::Pending,
        }
        .into();
        assert!(err.is_conflict());
    }
}
