//! Authenticated session as reported by the auth backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Evidence that a user is currently signed in.
///
/// Sessions are replaced wholesale on every auth event and never edited in
/// place. Access tokens stay with the backend client that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque user identifier assigned by the auth backend.
    pub user_id: String,
    /// Email address the backend has on file for the user.
    pub email: String,
    /// When the backend will stop honouring the session, if known.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create a session without expiry information.
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            expires_at: None,
        }
    }

    /// Whether the session's expiry has passed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
