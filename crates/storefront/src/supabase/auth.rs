//! GoTrue (Supabase Auth) requests.
//!
//! Email/password sign-up and sign-in, refresh-token exchange and logout.

use chrono::{TimeDelta, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use arenza_core::{Email, Session};

use super::error_message;
use crate::error::AuthError;

/// A signed-in session together with the tokens that back it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// What the rest of the client gets to see.
    pub session: Session,
    /// JWT sent as the bearer token on authenticated requests.
    pub access_token: SecretString,
    /// Exchanged for a new access token once this one expires.
    pub refresh_token: Option<SecretString>,
}

impl AuthSession {
    /// Whether the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.session.is_expired_at(Utc::now())
    }
}

/// Request body for password sign-up and sign-in.
#[derive(Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Request body for the refresh-token grant.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Token endpoint response. Sign-up returns the same shape when the project
/// confirms emails automatically, and a bare user otherwise.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Access token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl TokenResponse {
    /// The session carried by this response, if it has one.
    pub(crate) fn into_session(self) -> Option<AuthSession> {
        let access_token = self.access_token?;
        let user = self.user?;
        let expires_at = self
            .expires_in
            .and_then(TimeDelta::try_seconds)
            .map(|lifetime| Utc::now() + lifetime);

        Some(AuthSession {
            session: Session {
                user_id: user.id,
                email: user.email.unwrap_or_default(),
                expires_at,
            },
            access_token: SecretString::from(access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
        })
    }
}

/// Register an account.
///
/// Returns a session only when the project does not require email
/// confirmation.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the backend refuses the sign-up.
#[instrument(skip(client, anon_key, password), fields(email = %email))]
pub async fn sign_up(
    client: &reqwest::Client,
    base: &Url,
    anon_key: &str,
    email: &Email,
    password: &SecretString,
) -> Result<Option<AuthSession>, AuthError> {
    let url = join(base, "auth/v1/signup")?;
    let response = client
        .post(url)
        .bearer_auth(anon_key)
        .json(&PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| AuthError::Parse(e.to_string()))?;
    Ok(token.into_session())
}

/// Sign in with email and password.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` for a wrong email/password pair.
#[instrument(skip(client, anon_key, password), fields(email = %email))]
pub async fn sign_in_with_password(
    client: &reqwest::Client,
    base: &Url,
    anon_key: &str,
    email: &Email,
    password: &SecretString,
) -> Result<AuthSession, AuthError> {
    let url = join(base, "auth/v1/token?grant_type=password")?;
    let response = client
        .post(url)
        .bearer_auth(anon_key)
        .json(&PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        })
        .send()
        .await?;

    token_session(response).await
}

/// Exchange a refresh token for a new session.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the refresh token is no longer valid.
#[instrument(skip_all)]
pub async fn refresh_session(
    client: &reqwest::Client,
    base: &Url,
    anon_key: &str,
    refresh_token: &SecretString,
) -> Result<AuthSession, AuthError> {
    let url = join(base, "auth/v1/token?grant_type=refresh_token")?;
    let response = client
        .post(url)
        .bearer_auth(anon_key)
        .json(&RefreshRequest {
            refresh_token: refresh_token.expose_secret(),
        })
        .send()
        .await?;

    token_session(response).await
}

/// Revoke the session behind `access_token`.
///
/// Only this session is revoked; the user's sessions on other devices stay
/// signed in.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the backend refuses the logout.
#[instrument(skip_all)]
pub async fn sign_out(
    client: &reqwest::Client,
    base: &Url,
    access_token: &SecretString,
) -> Result<(), AuthError> {
    let response = client
        .post(logout_url(base)?)
        .bearer_auth(access_token.expose_secret())
        .send()
        .await?;

    let status = response.status();
    // An already-revoked session still counts as signed out.
    if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn logout_url(base: &Url) -> Result<Url, AuthError> {
    join(base, "auth/v1/logout?scope=local")
}

async fn token_session(response: reqwest::Response) -> Result<AuthSession, AuthError> {
    let status = response.status();

    if status.is_success() {
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Parse(e.to_string()))?;
        return token
            .into_session()
            .ok_or_else(|| AuthError::Parse("token response without session".to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    if status == reqwest::StatusCode::BAD_REQUEST && is_invalid_grant(&body) {
        return Err(AuthError::InvalidCredentials);
    }

    Err(AuthError::Rejected {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// GoTrue reports bad credentials as `invalid_grant` / `invalid_credentials`.
fn is_invalid_grant(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body).is_ok_and(|value| {
        ["error", "error_code", "code"].iter().any(|key| {
            value
                .get(key)
                .and_then(serde_json::Value::as_str)
                .is_some_and(|code| matches!(code, "invalid_grant" | "invalid_credentials"))
        })
    })
}

fn join(base: &Url, path: &str) -> Result<Url, AuthError> {
    base.join(path)
        .map_err(|e| AuthError::Parse(format!("invalid auth URL: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_into_session() {
        let token: TokenResponse = serde_json::from_str(
            r#"{
                "access_token": "jwt",
                "token_type": "bearer",
                "expires_in": 3600,
                "refresh_token": "r1",
                "user": {"id": "8d0f", "email": "admin@x.com", "role": "authenticated"}
            }"#,
        )
        .unwrap();

        let auth = token.into_session().unwrap();
        assert_eq!(auth.session.user_id, "8d0f");
        assert_eq!(auth.session.email, "admin@x.com");
        assert!(auth.session.expires_at.unwrap() > Utc::now());
        assert!(!auth.is_expired());
        assert_eq!(auth.access_token.expose_secret(), "jwt");
    }

    #[test]
    fn test_unconfirmed_sign_up_has_no_session() {
        // Projects with email confirmation return only the user.
        let token: TokenResponse =
            serde_json::from_str(r#"{"id": "8d0f", "email": "new@x.com"}"#).unwrap();
        assert!(token.into_session().is_none());
    }

    #[test]
    fn test_is_invalid_grant() {
        assert!(is_invalid_grant(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
        ));
        assert!(is_invalid_grant(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#
        ));
        assert!(!is_invalid_grant(r#"{"error":"over_request_rate_limit"}"#));
        assert!(!is_invalid_grant("not json"));
    }

    #[test]
    fn test_logout_is_local_scope() {
        let base = Url::parse("https://abcd.supabase.co/").unwrap();
        let url = logout_url(&base).unwrap();
        assert_eq!(url.path(), "/auth/v1/logout");
        assert_eq!(url.query(), Some("scope=local"));
    }

    #[test]
    fn test_join_keeps_project_path() {
        let base = Url::parse("https://abcd.supabase.co/").unwrap();
        let url = join(&base, "auth/v1/token?grant_type=password").unwrap();
        assert_eq!(
            url.as_str(),
            "https://abcd.supabase.co/auth/v1/token?grant_type=password"
        );
    }
}
