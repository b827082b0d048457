//! Custom error types for the application.
//!
//! Provides structured error handling with meaningful error messages
//! and proper error categorization for each domain:
//!
//! - [`ApiError`] - every failure surfaced by the gateway, caches and stores
//! - [`StorageError`] - localStorage operations for session persistence

use serde_json::Value;
use thiserror::Error;

/// The one error type returned by the gateway, caches and stores.
///
/// Protocol failures always carry the HTTP status; the message is resolved
/// from the response body by [`crate::core::gateway`] before the error is
/// built, so call sites never inspect raw bodies.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never produced a response (network down, CORS, aborted).
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("{message}")]
    Http {
        status: u16,
        message: String,
        /// `error.details` from the CMS error envelope, when present.
        details: Option<Value>,
    },

    /// The response arrived but did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// Rejected locally before any request was sent.
    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    /// Shorthand for a local precondition failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status for protocol failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401 and 403 responses.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Storage errors for localStorage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// localStorage not available.
    #[error("localStorage not available")]
    Unavailable,
    /// Failed to serialize a value before writing it.
    #[error("failed to serialize value for '{0}'")]
    SerializationFailed(String),
    /// Failed to write to localStorage.
    #[error("failed to save '{0}' to localStorage")]
    SaveFailed(String),
    /// Failed to remove from localStorage.
    #[error("failed to remove '{0}' from localStorage")]
    RemoveFailed(String),
}
