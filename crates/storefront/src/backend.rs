//! Capabilities the session controller needs from the hosted backend.
//!
//! The controller is generic over these traits so it can run against the
//! Supabase client in production and against in-memory fakes in tests.

use std::future::Future;

use secrecy::SecretString;
use tokio::sync::mpsc;

use arenza_core::{Email, Product, ProductId, ProductInput, Session};

use crate::error::{AuthError, BackendError};

/// Why the auth backend reported a session change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthChangeKind {
    /// Sent once, right after subscribing, with whatever session exists.
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A session-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub kind: AuthChangeKind,
    /// The session after the change, `None` when signed out.
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub const fn new(kind: AuthChangeKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }
}

/// Create a connected publisher/subscription pair.
#[must_use]
pub fn session_channel() -> (SessionPublisher, SessionEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionPublisher { tx }, SessionEvents { rx })
}

/// Backend side of a session subscription.
///
/// Events are delivered in the order they are published. Nothing is coalesced:
/// publishing the same session twice yields two events.
#[derive(Debug, Clone)]
pub struct SessionPublisher {
    tx: mpsc::UnboundedSender<AuthChange>,
}

impl SessionPublisher {
    /// Publish a change. Returns `false` once the subscriber has gone away.
    pub fn publish(&self, change: AuthChange) -> bool {
        self.tx.send(change).is_ok()
    }

    /// Whether the subscriber has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Subscriber side of a session subscription.
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<AuthChange>,
}

impl SessionEvents {
    /// Wait for the next change. `None` once the backend drops its publisher.
    pub async fn next(&mut self) -> Option<AuthChange> {
        self.rx.recv().await
    }
}

/// Sign-up, sign-in, sign-out and session-change notifications.
pub trait AuthBackend: Send + Sync + 'static {
    /// Start receiving session changes.
    ///
    /// A backend serves a single subscriber; subscribing again replaces the
    /// previous subscription, whose stream then ends. Implementations may
    /// deliver an [`AuthChangeKind::InitialSession`] event right away, but
    /// subscribers must not rely on it.
    fn subscribe(&self) -> SessionEvents;

    /// Register a new account.
    fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Sign in with email and password.
    fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// End the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// CRUD access to the product catalog.
pub trait CatalogBackend: Send + Sync + 'static {
    /// All products, ordered by ascending identifier.
    fn list(&self) -> impl Future<Output = Result<Vec<Product>, BackendError>> + Send;

    fn create(&self, input: &ProductInput)
    -> impl Future<Output = Result<(), BackendError>> + Send;

    fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    fn delete(&self, id: ProductId) -> impl Future<Output = Result<(), BackendError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_publish_order_without_coalescing() {
        let (publisher, mut events) = session_channel();
        let session = Session::new("u-1", "a@b.c");

        assert!(publisher.publish(AuthChange::new(AuthChangeKind::SignedIn, Some(session.clone()))));
        assert!(publisher.publish(AuthChange::new(AuthChangeKind::SignedIn, Some(session.clone()))));
        assert!(publisher.publish(AuthChange::new(AuthChangeKind::SignedOut, None)));
        drop(publisher);

        let mut kinds = Vec::new();
        while let Some(change) = events.next().await {
            kinds.push(change.kind);
        }
        assert_eq!(
            kinds,
            vec![
                AuthChangeKind::SignedIn,
                AuthChangeKind::SignedIn,
                AuthChangeKind::SignedOut
            ]
        );
    }

    #[test]
    fn test_publish_after_subscriber_dropped() {
        let (publisher, events) = session_channel();
        drop(events);
        assert!(publisher.is_closed());
        assert!(!publisher.publish(AuthChange::new(AuthChangeKind::SignedOut, None)));
    }
}
