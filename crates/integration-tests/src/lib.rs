//! Scenario tests for the Arenza session controller.
//!
//! The library half of this crate provides in-memory stand-ins for the hosted
//! backend and a view that records every instruction, so the tests under
//! `tests/` can drive a real [`SessionController`] deterministically.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p arenza-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_roles` - role derivation, chrome and duplicate events
//! - `refresh_ordering` - overlapping refreshes, sorting, failures, timeouts
//! - `product_actions` - admin gating and mutation outcomes
//! - `auth_flows` - sign-in, sign-up, sign-out and lifecycle errors

#![allow(clippy::missing_panics_doc)]

pub mod auth;
pub mod catalog;
pub mod view;

use std::time::Duration;

use arenza_core::{Email, Price, Product, ProductId, ProductInput, Session};
use arenza_storefront::SessionController;

pub use auth::{AuthFailure, FakeAuth};
pub use catalog::FakeCatalog;
pub use view::{RecordingView, ViewCall};

/// Administrator configured for every harness.
pub const ADMIN_EMAIL: &str = "admin@arenza.com.br";

/// Timeout the harness gives the controller for backend calls.
pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(5);

pub type TestController = SessionController<FakeAuth, FakeCatalog, RecordingView>;

/// A controller wired to fakes, with handles to inspect each of them.
pub struct Harness {
    pub controller: TestController,
    pub auth: FakeAuth,
    pub catalog: FakeCatalog,
    pub view: RecordingView,
}

impl Harness {
    /// A controller over an empty catalog. Not started.
    #[must_use]
    pub fn new() -> Self {
        Self::with_products(Vec::new())
    }

    /// A controller over `products`, stored in the given order. Not started.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let auth = FakeAuth::new();
        let catalog = FakeCatalog::with_products(products);
        let view = RecordingView::new();
        let controller = SessionController::new(
            auth.clone(),
            catalog.clone(),
            view.clone(),
            BACKEND_TIMEOUT,
        );

        Self {
            controller,
            auth,
            catalog,
            view,
        }
    }

    /// Start the controller with [`ADMIN_EMAIL`] as the administrator.
    pub async fn start(&self) {
        self.controller
            .start(admin_email())
            .await
            .expect("controller should start");
    }

    /// Deliver a session change directly and wait for its refresh.
    pub async fn change_session(&self, session: Option<Session>) {
        let refresh = self.controller.on_session_changed(session).await;
        let _ = refresh.await.expect("refresh task should not panic");
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

#[must_use]
pub fn admin_email() -> Email {
    Email::parse(ADMIN_EMAIL).expect("admin email is valid")
}

#[must_use]
pub fn admin_session() -> Session {
    Session::new("user-admin", ADMIN_EMAIL)
}

#[must_use]
pub fn customer_session() -> Session {
    Session::new("user-customer", "cliente@example.com")
}

/// A product with a price given in reais, e.g. `"149,90"`.
#[must_use]
pub fn product(id: i64, name: &str, price: &str) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_owned(),
        price: Price::parse(price).expect("valid test price"),
        description: String::new(),
        image: format!("https://cdn.arenza.com.br/{id}.jpg"),
    }
}

#[must_use]
pub fn product_input(name: &str, price: &str) -> ProductInput {
    ProductInput {
        name: name.to_owned(),
        price: Price::parse(price).expect("valid test price"),
        description: String::new(),
        image: String::new(),
    }
}

/// Products in the order the tests usually seed them.
#[must_use]
pub fn sample_catalog() -> Vec<Product> {
    vec![
        product(1, "Biquíni Lua", "149,90"),
        product(2, "Maiô Mar", "199,00"),
        product(3, "Saída de Praia", "89,50"),
    ]
}

pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
