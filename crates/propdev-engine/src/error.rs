use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("No user record provisioned for identity '{0}'")]
    UserNotFound(String),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {field} — {reason}")]
    ValidationFailed { field: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
