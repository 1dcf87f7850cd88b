//! Error types shared across the taskpilot crates.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The failure taxonomy produced by the request gateway.
///
/// Every non-2xx backend response (and every transport failure) is
/// classified into exactly one of these kinds before it reaches the
/// rest of the application. Higher layers never see raw status codes.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiError {
    /// The credential was missing, expired, or rejected (HTTP 401).
    /// The gateway has already cleared the stored credential when
    /// this is returned.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller is authenticated but not allowed (HTTP 403).
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// The requested entity does not exist (HTTP 404).
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The request was rejected by server-side validation (HTTP 422),
    /// or by client-side pre-validation before any dispatch.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The backend failed (HTTP 5xx). The message is always generic;
    /// backend internals are never carried through.
    #[error("server error")]
    Server,

    /// Any other failure: unexpected status codes, transport errors,
    /// or unparseable responses.
    #[error("request failed: {message}")]
    Unknown { message: String },
}

impl ApiError {
    /// Creates a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a NotFound error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an Unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Check if this is an Unauthorized error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a Validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

/// A type alias for `Result<T, ApiError>`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructor_helpers() {
        let err = ApiError::validation("title is required");
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "validation failed: title is required");

        let err = ApiError::not_found("Conversation 9 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unauthorized_predicate() {
        assert!(ApiError::Unauthorized.is_unauthorized());
        assert!(!ApiError::Server.is_unauthorized());
    }
}
