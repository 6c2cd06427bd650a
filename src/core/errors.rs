use thiserror::Error;

use crate::services::store::StoreError;

/// Errors surfaced by matching operations
///
/// Every variant is terminal for the current call. Operations that fail
/// leave storage untouched because their transaction is never committed.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Malformed or out-of-range input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced user, criteria, state or request does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// State machine precondition violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Request that can never succeed, such as targeting oneself
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl MatchError {
    /// Short machine-readable label used in error responses
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::Validation(_) => "validation_error",
            MatchError::NotFound(_) => "not_found",
            MatchError::Conflict(_) => "conflict",
            MatchError::InvalidRequest(_) => "invalid_request",
            MatchError::Storage(_) => "storage_error",
        }
    }
}
