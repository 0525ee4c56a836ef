//! Viewer role derived from the current session.

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::session::Session;

/// Access level of whoever is using the client.
///
/// A role is never stored next to the session it came from; call
/// [`Role::derive`] against the current session every time one is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// No session.
    #[default]
    Guest,
    /// Signed in, but not the administrator.
    AuthenticatedUser,
    /// Signed in as the configured administrator.
    Admin,
}

impl Role {
    /// Derive the role for `session`.
    ///
    /// Admin requires an exact, case-sensitive match between the session email
    /// and `admin_email`. Without a configured admin email nobody is admin.
    #[must_use]
    pub fn derive(session: Option<&Session>, admin_email: Option<&Email>) -> Self {
        match (session, admin_email) {
            (None, _) => Self::Guest,
            (Some(session), Some(admin)) if admin.matches(&session.email) => Self::Admin,
            (Some(_), _) => Self::AuthenticatedUser,
        }
    }

    /// Whether catalog mutations are permitted.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Whether a user is signed in, admin or not.
    #[must_use]
    pub const fn is_signed_in(self) -> bool {
        !matches!(self, Self::Guest)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::AuthenticatedUser => write!(f, "authenticated_user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}
