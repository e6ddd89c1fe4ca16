//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and invalid state transitions.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote identifier (empty or malformed)
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid change cursor / page token
    #[error("Invalid page cursor: {0}")]
    InvalidCursor(String),

    /// Invalid user identifier
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidRemoteId("".to_string());
        assert_eq!(err.to_string(), "Invalid remote ID: ");

        let err = DomainError::InvalidState {
            from: "idle".to_string(),
            to: "error".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid state transition from idle to error");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidCursor("x".to_string());
        let err2 = DomainError::InvalidCursor("x".to_string());
        let err3 = DomainError::InvalidCursor("y".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
