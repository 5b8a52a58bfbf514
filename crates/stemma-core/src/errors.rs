//! Unified error system for Stemma core
//!
//! One simple error type for foundation-level failures. The session crate
//! layers its own structured error on top for the user-visible taxonomy.

use serde::{Deserialize, Serialize};

/// Unified error type for core operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum StemmaError {
    /// Invalid input or configuration.
    #[error("Invalid: {message}")]
    Invalid {
        /// Error message describing the invalid input
        message: String,
    },

    /// Resource not found.
    #[error("Not found: {message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// State conflict, such as re-assigning an already-assigned identifier.
    #[error("Conflict: {message}")]
    Conflict {
        /// Error message describing the conflicting state
        message: String,
    },

    /// Internal system error.
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl StemmaError {
    /// Create an invalid input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Standard Result type for core operations.
pub type Result<T> = std::result::Result<T, StemmaError>;
