//! In-memory auth backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use secrecy::SecretString;

use arenza_core::{Email, Session};
use arenza_storefront::{
    AuthBackend, AuthChange, AuthChangeKind, AuthError, SessionEvents, SessionPublisher,
    session_channel,
};

use crate::lock;

/// Failure the next auth call should report.
#[derive(Debug, Clone)]
pub enum AuthFailure {
    InvalidCredentials,
    Rejected { status: u16, message: String },
}

impl AuthFailure {
    fn into_error(self) -> AuthError {
        match self {
            Self::InvalidCredentials => AuthError::InvalidCredentials,
            Self::Rejected { status, message } => AuthError::Rejected { status, message },
        }
    }
}

/// Auth backend that accepts any password unless told to fail.
///
/// Successful sign-in publishes `SignedIn` with a session for the given email;
/// sign-out publishes `SignedOut`. Clones share state.
#[derive(Clone, Default)]
pub struct FakeAuth {
    inner: Arc<FakeAuthInner>,
}

#[derive(Default)]
struct FakeAuthInner {
    publisher: Mutex<Option<SessionPublisher>>,
    subscriptions: AtomicUsize,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
    next_failure: Mutex<Option<AuthFailure>>,
    hang: AtomicBool,
}

impl FakeAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a session change to the current subscriber.
    ///
    /// # Panics
    ///
    /// If nobody is subscribed.
    pub fn emit(&self, kind: AuthChangeKind, session: Option<Session>) {
        assert!(self.try_emit(kind, session), "no live session subscriber");
    }

    /// Publish a session change; `false` if nobody received it.
    pub fn try_emit(&self, kind: AuthChangeKind, session: Option<Session>) -> bool {
        lock(&self.inner.publisher)
            .as_ref()
            .is_some_and(|publisher| publisher.publish(AuthChange::new(kind, session)))
    }

    /// Make the next sign-in, sign-up or sign-out fail.
    pub fn fail_next(&self, failure: AuthFailure) {
        *lock(&self.inner.next_failure) = Some(failure);
    }

    /// Make every call wait forever, to exercise timeouts.
    pub fn hang(&self) {
        self.inner.hang.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn subscriptions(&self) -> usize {
        self.inner.subscriptions.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_in_calls(&self) -> usize {
        self.inner.sign_in_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_up_calls(&self) -> usize {
        self.inner.sign_up_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_out_calls(&self) -> usize {
        self.inner.sign_out_calls.load(Ordering::SeqCst)
    }

    async fn gate(&self) -> Result<(), AuthError> {
        if self.inner.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        lock(&self.inner.next_failure)
            .take()
            .map_or(Ok(()), |failure| Err(failure.into_error()))
    }
}

impl AuthBackend for FakeAuth {
    fn subscribe(&self) -> SessionEvents {
        let (publisher, events) = session_channel();
        *lock(&self.inner.publisher) = Some(publisher);
        self.inner.subscriptions.fetch_add(1, Ordering::SeqCst);
        events
    }

    async fn sign_up(&self, _email: &Email, _password: &SecretString) -> Result<(), AuthError> {
        self.inner.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await
    }

    async fn sign_in(&self, email: &Email, _password: &SecretString) -> Result<(), AuthError> {
        self.inner.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let session = Session::new(format!("user-{}", email.as_str()), email.as_str());
        let _ = self.try_emit(AuthChangeKind::SignedIn, Some(session));
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        let _ = self.try_emit(AuthChangeKind::SignedOut, None);
        Ok(())
    }
}
