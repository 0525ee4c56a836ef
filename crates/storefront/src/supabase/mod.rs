//! Supabase backend: GoTrue for auth, PostgREST for the catalog.
//!
//! [`SupabaseClient`] implements both [`AuthBackend`] and [`CatalogBackend`].
//! It keeps the signed-in session (with its tokens) in memory, sends the
//! access token as the bearer on catalog requests, and publishes a session
//! change to its single subscriber whenever the session is replaced.
//!
//! # Example
//!
//! ```rust,ignore
//! use arenza_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase)?;
//! let mut events = client.subscribe();
//! client.sign_in(&email, &password).await?;
//! let products = client.list().await?;
//! ```

mod auth;
mod rest;

pub use auth::AuthSession;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use arenza_core::{Email, Product, ProductId, ProductInput, Session};

use crate::backend::{
    AuthBackend, AuthChange, AuthChangeKind, CatalogBackend, SessionEvents, SessionPublisher,
    session_channel,
};
use crate::config::{ConfigurationError, SupabaseConfig};
use crate::error::{AuthError, BackendError};

/// Supabase API client.
///
/// Cheaply cloneable; clones share the session and the subscriber.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    /// Project URL, always ending in `/`.
    base_url: Url,
    anon_key: SecretString,
    session: RwLock<Option<AuthSession>>,
    subscriber: Mutex<Option<SessionPublisher>>,
}

impl SupabaseClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::HttpClient` if the anon key is not a valid
    /// header value or the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, ConfigurationError> {
        let mut apikey = HeaderValue::from_str(config.anon_key())
            .map_err(|e| ConfigurationError::HttpClient(format!("invalid anon key: {e}")))?;
        apikey.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("apikey", apikey);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigurationError::HttpClient(e.to_string()))?;

        let mut base_url = config.url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                base_url,
                anon_key: config.anon_key.clone(),
                session: RwLock::new(None),
                subscriber: Mutex::new(None),
            }),
        })
    }

    /// The current session, if signed in.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.stored_session().map(|auth| auth.session)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Publishes `TokenRefreshed` on success. If the backend rejects the
    /// refresh token the session is dropped and `SignedOut` is published;
    /// transport failures keep the session for a later attempt.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` when there is nothing to refresh,
    /// or the backend error.
    pub async fn refresh_session(&self) -> Result<(), AuthError> {
        let Some(refresh_token) = self.stored_session().and_then(|auth| auth.refresh_token) else {
            if self.replace_session(None).is_some() {
                self.publish(AuthChangeKind::SignedOut, None);
            }
            return Err(AuthError::SessionExpired);
        };

        match auth::refresh_session(
            &self.inner.http,
            &self.inner.base_url,
            self.inner.anon_key.expose_secret(),
            &refresh_token,
        )
        .await
        {
            Ok(renewed) => {
                let session = renewed.session.clone();
                self.replace_session(Some(renewed));
                debug!(user_id = %session.user_id, "session refreshed");
                self.publish(AuthChangeKind::TokenRefreshed, Some(session));
                Ok(())
            }
            Err(err @ (AuthError::Rejected { .. } | AuthError::InvalidCredentials)) => {
                warn!(error = %err, "refresh token rejected; signing out");
                self.replace_session(None);
                self.publish(AuthChangeKind::SignedOut, None);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Bearer token for catalog requests: the access token when signed in,
    /// otherwise the anon key. Renews an expired session first.
    async fn bearer(&self) -> SecretString {
        if self.stored_session().is_some_and(|auth| auth.is_expired())
            && let Err(err) = self.refresh_session().await
        {
            warn!(error = %err, "could not renew expired session");
        }

        self.stored_session().map_or_else(
            || self.inner.anon_key.clone(),
            |auth| auth.access_token,
        )
    }

    fn stored_session(&self) -> Option<AuthSession> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swap the stored session, returning the previous one.
    fn replace_session(&self, session: Option<AuthSession>) -> Option<AuthSession> {
        let mut guard = self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, session)
    }

    fn publish(&self, kind: AuthChangeKind, session: Option<Session>) {
        let subscriber = self
            .inner
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(publisher) = subscriber.as_ref()
            && !publisher.publish(AuthChange::new(kind, session))
        {
            debug!(?kind, "session subscriber has gone away");
        }
    }

    fn sign_in_completed(&self, auth: AuthSession) {
        let session = auth.session.clone();
        self.replace_session(Some(auth));
        info!(user_id = %session.user_id, "signed in");
        self.publish(AuthChangeKind::SignedIn, Some(session));
    }
}

impl AuthBackend for SupabaseClient {
    fn subscribe(&self) -> SessionEvents {
        let (publisher, events) = session_channel();
        publisher.publish(AuthChange::new(
            AuthChangeKind::InitialSession,
            self.current_session(),
        ));

        let previous = self
            .inner
            .subscriber
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(publisher);
        if previous.is_some() {
            debug!("replaced previous session subscriber");
        }
        events
    }

    async fn sign_up(&self, email: &Email, password: &SecretString) -> Result<(), AuthError> {
        let session = auth::sign_up(
            &self.inner.http,
            &self.inner.base_url,
            self.inner.anon_key.expose_secret(),
            email,
            password,
        )
        .await?;

        match session {
            Some(auth) => self.sign_in_completed(auth),
            None => info!(email = %email, "sign-up pending email confirmation"),
        }
        Ok(())
    }

    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<(), AuthError> {
        let auth = auth::sign_in_with_password(
            &self.inner.http,
            &self.inner.base_url,
            self.inner.anon_key.expose_secret(),
            email,
            password,
        )
        .await?;
        self.sign_in_completed(auth);
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // The local session goes away even if the backend call fails.
        let previous = self.replace_session(None);
        let result = match previous {
            Some(auth) => {
                auth::sign_out(&self.inner.http, &self.inner.base_url, &auth.access_token).await
            }
            None => Ok(()),
        };
        self.publish(AuthChangeKind::SignedOut, None);
        result
    }
}

impl CatalogBackend for SupabaseClient {
    async fn list(&self) -> Result<Vec<Product>, BackendError> {
        let bearer = self.bearer().await;
        rest::list_products(&self.inner.http, &self.inner.base_url, bearer.expose_secret()).await
    }

    async fn create(&self, input: &ProductInput) -> Result<(), BackendError> {
        let bearer = self.bearer().await;
        rest::insert_product(
            &self.inner.http,
            &self.inner.base_url,
            bearer.expose_secret(),
            input,
        )
        .await
    }

    async fn update(&self, id: ProductId, input: &ProductInput) -> Result<(), BackendError> {
        let bearer = self.bearer().await;
        rest::update_product(
            &self.inner.http,
            &self.inner.base_url,
            bearer.expose_secret(),
            id,
            input,
        )
        .await
    }

    async fn delete(&self, id: ProductId) -> Result<(), BackendError> {
        let bearer = self.bearer().await;
        rest::delete_product(
            &self.inner.http,
            &self.inner.base_url,
            bearer.expose_secret(),
            id,
        )
        .await
    }
}

/// Error payload shapes used by GoTrue and PostgREST.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Best human-readable message from an error response body.
pub(crate) fn error_message(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "(no error details provided)".to_string();
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .msg
                .or(parsed.message)
                .or(parsed.error_description)
                .or(parsed.error)
        })
        .unwrap_or_else(|| body.to_string())
}
