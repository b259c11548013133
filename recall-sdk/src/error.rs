//! Recall Error Types
//!
//! Defines error types for the Recall SDK.

use thiserror::Error;

/// Recall Result type alias
pub type RecallResult<T> = Result<T, RecallError>;

/// Recall errors
#[derive(Debug, Error)]
pub enum RecallError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigValidationError),

    /// Invalid input shape or enum value. Never retried.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Durable-store failure. The whole operation may be retried since
    /// every store call is a single transaction.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A destructive operation was invoked without `confirm = true`.
    #[error("confirmation required to clear session {session_id}")]
    ConfirmationRequired { session_id: String },

    /// Entity not found
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    /// A single entry alone overflows the caller's budget.
    #[error("entry {entry_id} ({size_bytes} bytes) exceeds budget of {budget_bytes} bytes")]
    BudgetExceeded {
        entry_id: String,
        size_bytes: usize,
        budget_bytes: usize,
    },

    /// External summarization capability failure (transport, quota)
    #[error("capability error: {message}")]
    Capability { message: String },

    /// Timeout error
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RecallError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a capability error
    pub fn capability(message: impl Into<String>) -> Self {
        Self::Capability {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is a budget overflow
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. })
    }

    /// Check if this error is a confirmation gate
    pub fn is_confirmation_required(&self) -> bool {
        matches!(self, Self::ConfirmationRequired { .. })
    }

    /// Check if this error is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RecallError::validation("bad importance value");
        assert!(err.to_string().contains("bad importance value"));

        let err = RecallError::not_found("Session", "abc123");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Session"));
        assert!(err.to_string().contains("abc123"));

        let err = RecallError::timeout(5000);
        assert!(err.is_timeout());
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_budget_exceeded_detail() {
        let err = RecallError::BudgetExceeded {
            entry_id: "e1".into(),
            size_bytes: 2048,
            budget_bytes: 1024,
        };
        assert!(err.is_budget_exceeded());
        assert!(err.to_string().contains("2048"));
        assert!(err.to_string().contains("1024"));
    }
}
