//! Recoverable error types for backend calls.
//!
//! Both enums are recovered locally by the session controller: the failure is
//! logged and a user-facing message (see `user_message`) is sent to the
//! matching view channel. Fatal bootstrap problems live in
//! [`crate::config::ConfigurationError`].

use std::time::Duration;

use thiserror::Error;

/// Errors returned by an auth backend (sign-up, sign-in, sign-out).
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email rejected before reaching the backend.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] arenza_core::EmailError),

    /// Wrong email/password combination.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The backend refused the request.
    #[error("auth rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The session ended and could not be renewed.
    #[error("session expired")]
    SessionExpired,

    /// The backend did not answer in time.
    #[error("auth request timed out after {0:?}")]
    Timeout(Duration),
}

impl AuthError {
    /// Text suitable for the auth prompt's error line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidEmail(err) => format!("Invalid email: {err}"),
            Self::InvalidCredentials => "Invalid email or password.".to_string(),
            Self::Rejected { message, .. } => message.clone(),
            Self::SessionExpired => "Your session has expired, please sign in again.".to_string(),
            Self::Timeout(_) => "The authentication service did not respond in time.".to_string(),
            Self::Http(_) | Self::Parse(_) => {
                "Authentication service unavailable, please try again.".to_string()
            }
        }
    }
}

/// Errors returned by a catalog backend (list, create, update, delete).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be understood.
    #[error("parse error: {0}")]
    Parse(String),

    /// The backend did not answer in time.
    #[error("catalog request timed out after {0:?}")]
    Timeout(Duration),
}

impl BackendError {
    /// Text suitable for the catalog error line.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Timeout(_) => "The catalog service did not respond in time.".to_string(),
            Self::Http(_) | Self::Parse(_) => {
                "Catalog service unavailable, please try again.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = AuthError::Rejected {
            status: 422,
            message: "User already registered".to_string(),
        };
        assert_eq!(err.to_string(), "auth rejected (422): User already registered");
        assert_eq!(err.user_message(), "User already registered");
    }

    #[test]
    fn test_timeouts_have_friendly_messages() {
        let auth = AuthError::Timeout(Duration::from_secs(10));
        assert!(auth.to_string().contains("timed out"));
        assert!(!auth.user_message().contains("10s"));

        let backend = BackendError::Timeout(Duration::from_secs(3));
        assert_eq!(
            backend.user_message(),
            "The catalog service did not respond in time."
        );
    }

    #[test]
    fn test_backend_api_message_is_surfaced() {
        let err = BackendError::Api {
            status: 409,
            message: "duplicate key value".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 409 - duplicate key value");
        assert_eq!(err.user_message(), "duplicate key value");
    }
}
