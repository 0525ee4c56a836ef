//! Session, role and catalog synchronization.
//!
//! [`SessionController`] is the single owner of "who is using this client and
//! what may they do". It reacts to session changes from the auth backend,
//! derives the viewer's [`Role`], keeps the product cache in step with the
//! catalog backend and tells the [`View`] what to show.
//!
//! # Ordering
//!
//! Session changes are handled one at a time by a single event-loop task. For
//! each change the controller replaces the session, derives the role, updates
//! the chrome and then spawns a catalog refresh.
//!
//! Refreshes are never cancelled. A refresh that was started under an older
//! session still completes, but it renders with the role derived *when it
//! renders*, under the same lock that installs the new product list. A slow
//! response fetched as a guest therefore cannot show admin controls after a
//! sign-out, nor hide them after a sign-in.
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = SessionController::new(client.clone(), client, view, config.backend_timeout);
//! controller.start(config.admin_email.clone()).await?;
//! controller.sign_in("admin@arenza.com.br", &password).await?;
//! ```

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use arenza_core::{Email, Product, ProductId, ProductInput, Role, Session};

use crate::backend::{AuthBackend, CatalogBackend};
use crate::config::ConfigurationError;
use crate::error::{AuthError, BackendError};
use crate::view::View;

/// Shown for any sign-in failure, whatever the backend said.
const SIGN_IN_FAILED: &str = "Invalid email or password.";

/// Shown after a successful sign-up.
const SIGN_UP_NOTICE: &str = "Account created! Check your email to confirm your registration.";

/// Result of an admin action that did not fail at the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The backend accepted the action (or the editor was opened).
    Applied,
    /// The product is not in the cache, typically a stale click after a
    /// refresh removed it. Nothing was sent to the backend.
    NotCached,
    /// The current role may not perform the action. Nothing was sent to the
    /// backend.
    Forbidden,
}

#[derive(Debug, Clone, Copy)]
enum Mutation {
    Create,
    Update(ProductId),
    Delete(ProductId),
}

impl Mutation {
    const fn verb(self) -> &'static str {
        match self {
            Self::Create => "add",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
        }
    }

    const fn id(self) -> Option<ProductId> {
        match self {
            Self::Create => None,
            Self::Update(id) | Self::Delete(id) => Some(id),
        }
    }

    const fn notice(self) -> &'static str {
        match self {
            Self::Create => "Product added.",
            Self::Update(_) => "Product updated.",
            Self::Delete(_) => "Product deleted.",
        }
    }
}

/// Mutable state, only ever touched through the controller's lock.
#[derive(Debug, Default)]
struct ControllerState {
    admin_email: Option<Email>,
    session: Option<Session>,
    /// Ascending by id; replaced wholesale by each completed refresh.
    products: Vec<Product>,
    /// Whether any refresh has completed yet.
    loaded: bool,
}

impl ControllerState {
    fn role(&self) -> Role {
        Role::derive(self.session.as_ref(), self.admin_email.as_ref())
    }

    fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }
}

/// Coordinates auth events, role derivation, the product cache and the view.
///
/// Cheaply cloneable; clones share the same state.
pub struct SessionController<A, C, V> {
    inner: Arc<ControllerInner<A, C, V>>,
}

impl<A, C, V> Clone for SessionController<A, C, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<A, C, V> {
    auth: A,
    catalog: C,
    view: V,
    backend_timeout: Duration,
    state: RwLock<ControllerState>,
    started: AtomicBool,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl<A, C, V> SessionController<A, C, V>
where
    A: AuthBackend,
    C: CatalogBackend,
    V: View,
{
    /// Create a controller. Nothing happens until [`start`](Self::start).
    ///
    /// `backend_timeout` bounds every auth and catalog call; expiry is handled
    /// like any other backend failure.
    pub fn new(auth: A, catalog: C, view: V, backend_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                auth,
                catalog,
                view,
                backend_timeout,
                state: RwLock::new(ControllerState::default()),
                started: AtomicBool::new(false),
                event_loop: Mutex::new(None),
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribe to session changes and begin handling them.
    ///
    /// No catalog fetch happens here; the first refresh follows the first
    /// session change the backend delivers. Until then the cache is empty and
    /// [`catalog_loaded`](Self::catalog_loaded) is `false`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::AlreadyStarted` if called more than once.
    pub async fn start(&self, admin_email: Email) -> Result<(), ConfigurationError> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(ConfigurationError::AlreadyStarted);
        }

        info!(admin_email = %admin_email, "starting session controller");
        self.inner.state.write().await.admin_email = Some(admin_email);

        let mut events = self.inner.auth.subscribe();
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            while let Some(change) = events.next().await {
                debug!(kind = ?change.kind, "session change received");
                // The refresh runs detached so later events are not held up.
                drop(controller.on_session_changed(change.session).await);
            }
            debug!("session subscription ended");
        });

        *self.inner.event_loop.lock().await = Some(handle);
        Ok(())
    }

    /// Stop handling session changes. In-flight refreshes still complete.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.inner.event_loop.lock().await.take() {
            handle.abort();
            info!("session controller stopped");
        }
    }

    // =========================================================================
    // Session changes
    // =========================================================================

    /// Install `session`, update the chrome for the derived role and trigger a
    /// catalog refresh.
    ///
    /// Every call refreshes, including repeats of the current session. The
    /// returned handle resolves when that refresh finishes; dropping it leaves
    /// the refresh running.
    pub async fn on_session_changed(
        &self,
        session: Option<Session>,
    ) -> JoinHandle<Result<(), BackendError>> {
        {
            let mut state = self.inner.state.write().await;
            state.session = session;
            let role = state.role();
            info!(%role, "session changed");
            self.inner.view.set_chrome(role);
        }

        let controller = self.clone();
        tokio::spawn(async move { controller.refresh_catalog().await })
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Fetch the catalog, replace the cache and render it.
    ///
    /// On failure the cache and the view keep their previous contents.
    ///
    /// # Errors
    ///
    /// Returns the backend error (including timeouts) after logging it.
    #[instrument(skip(self))]
    pub async fn refresh_catalog(&self) -> Result<(), BackendError> {
        let mut products = match self
            .bounded(self.inner.catalog.list(), BackendError::Timeout)
            .await
        {
            Ok(products) => products,
            Err(err) => {
                error!(error = %err, "failed to refresh catalog");
                return Err(err);
            }
        };

        if !products.is_sorted_by_key(|product| product.id) {
            warn!(
                count = products.len(),
                "catalog backend returned products out of order; sorting by id"
            );
            products.sort_by_key(|product| product.id);
        }

        let mut state = self.inner.state.write().await;
        state.products = products;
        state.loaded = true;
        let role = state.role();
        debug!(%role, count = state.products.len(), "rendering catalog");
        self.inner.view.render_catalog(role, &state.products);
        Ok(())
    }

    /// Add a product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns the backend error after showing it on the catalog error channel.
    pub async fn create_product(&self, input: ProductInput) -> Result<ActionOutcome, BackendError> {
        let role = self.current_role().await;
        if !role.is_admin() {
            warn!(%role, "product creation refused");
            return Ok(ActionOutcome::Forbidden);
        }

        let result = self
            .bounded(self.inner.catalog.create(&input), BackendError::Timeout)
            .await;
        self.finish_mutation(Mutation::Create, result).await
    }

    /// Open the edit prompt for a cached product. Admin only.
    pub async fn open_editor(&self, id: ProductId) -> ActionOutcome {
        let state = self.inner.state.read().await;
        let Some(product) = state.find(id) else {
            debug!(%id, "edit requested for a product that is not cached");
            return ActionOutcome::NotCached;
        };
        if !state.role().is_admin() {
            warn!(%id, "editor refused");
            return ActionOutcome::Forbidden;
        }
        self.inner.view.open_editor(product);
        ActionOutcome::Applied
    }

    /// Update a cached product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns the backend error after showing it on the catalog error channel.
    pub async fn request_edit(
        &self,
        id: ProductId,
        input: ProductInput,
    ) -> Result<ActionOutcome, BackendError> {
        if let Some(outcome) = self.authorize_cached(id).await {
            return Ok(outcome);
        }

        let result = self
            .bounded(self.inner.catalog.update(id, &input), BackendError::Timeout)
            .await;
        self.finish_mutation(Mutation::Update(id), result).await
    }

    /// Delete a cached product. Admin only.
    ///
    /// # Errors
    ///
    /// Returns the backend error after showing it on the catalog error channel.
    pub async fn request_delete(&self, id: ProductId) -> Result<ActionOutcome, BackendError> {
        if let Some(outcome) = self.authorize_cached(id).await {
            return Ok(outcome);
        }

        let result = self
            .bounded(self.inner.catalog.delete(id), BackendError::Timeout)
            .await;
        self.finish_mutation(Mutation::Delete(id), result).await
    }

    /// `None` when `id` is cached and the current role is admin, otherwise the
    /// outcome to report without touching the backend.
    async fn authorize_cached(&self, id: ProductId) -> Option<ActionOutcome> {
        let state = self.inner.state.read().await;
        if state.find(id).is_none() {
            debug!(%id, "action requested for a product that is not cached");
            return Some(ActionOutcome::NotCached);
        }
        let role = state.role();
        if !role.is_admin() {
            warn!(%id, %role, "product action refused");
            return Some(ActionOutcome::Forbidden);
        }
        None
    }

    async fn finish_mutation(
        &self,
        mutation: Mutation,
        result: Result<(), BackendError>,
    ) -> Result<ActionOutcome, BackendError> {
        match result {
            Ok(()) => {
                info!(action = mutation.verb(), id = ?mutation.id(), "catalog mutation applied");
                if matches!(mutation, Mutation::Update(_)) {
                    self.inner.view.close_editor();
                }
                self.inner.view.show_notice(mutation.notice());
                // The mutation itself succeeded; a stale cache is only logged.
                if let Err(err) = self.refresh_catalog().await {
                    warn!(error = %err, "catalog refresh after mutation failed");
                }
                Ok(ActionOutcome::Applied)
            }
            Err(err) => {
                error!(
                    action = mutation.verb(),
                    id = ?mutation.id(),
                    error = %err,
                    "catalog mutation failed"
                );
                self.inner.view.show_catalog_error(&format!(
                    "Failed to {} product: {}",
                    mutation.verb(),
                    err.user_message()
                ));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Sign in. The session itself arrives later as a session change.
    ///
    /// # Errors
    ///
    /// Returns the auth error after showing a generic message on the auth
    /// error channel.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), AuthError> {
        self.inner.view.clear_auth_error();

        let result = match Email::parse(email) {
            Ok(email) => {
                self.bounded(self.inner.auth.sign_in(&email, password), AuthError::Timeout)
                    .await
            }
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(()) => {
                info!("signed in");
                self.inner.view.close_auth_prompt();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign-in failed");
                self.inner.view.show_auth_error(SIGN_IN_FAILED);
                Err(err)
            }
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns the auth error after showing it on the auth error channel.
    #[instrument(skip(self, password))]
    pub async fn sign_up(&self, email: &str, password: &SecretString) -> Result<(), AuthError> {
        self.inner.view.clear_auth_error();

        let result = match Email::parse(email) {
            Ok(email) => {
                self.bounded(self.inner.auth.sign_up(&email, password), AuthError::Timeout)
                    .await
            }
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(()) => {
                info!("account created");
                self.inner.view.show_notice(SIGN_UP_NOTICE);
                self.inner.view.close_auth_prompt();
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign-up failed");
                self.inner.view.show_auth_error(&err.user_message());
                Err(err)
            }
        }
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns the auth error after showing it on the auth error channel.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        match self
            .bounded(self.inner.auth.sign_out(), AuthError::Timeout)
            .await
        {
            Ok(()) => {
                info!("signed out");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign-out failed");
                self.inner
                    .view
                    .show_auth_error(&format!("Sign-out failed: {}", err.user_message()));
                Err(err)
            }
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Role derived from the current session.
    pub async fn current_role(&self) -> Role {
        self.inner.state.read().await.role()
    }

    /// The current session, if any.
    pub async fn session(&self) -> Option<Session> {
        self.inner.state.read().await.session.clone()
    }

    /// Products from the last completed refresh.
    pub async fn cached_products(&self) -> Vec<Product> {
        self.inner.state.read().await.products.clone()
    }

    /// Whether any refresh has completed since the controller was created.
    pub async fn catalog_loaded(&self) -> bool {
        self.inner.state.read().await.loaded
    }

    /// The cached product with `id`.
    pub async fn find_product(&self, id: ProductId) -> Option<Product> {
        self.inner.state.read().await.find(id).cloned()
    }

    /// Whether [`start`](Self::start) has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    async fn bounded<T, E>(
        &self,
        call: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce(Duration) -> E,
    ) -> Result<T, E> {
        let limit = self.inner.backend_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(on_timeout(limit)))
    }
}
