//! A view that records every instruction it receives.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use arenza_core::{Product, ProductId, Role};
use arenza_storefront::View;

use crate::lock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCall {
    Chrome(Role),
    Render { role: Role, ids: Vec<ProductId> },
    AuthError(String),
    CatalogError(String),
    CloseAuthPrompt,
    ClearAuthError,
    Notice(String),
    OpenEditor(ProductId),
    CloseEditor,
}

/// Clones share the same log.
#[derive(Clone)]
pub struct RecordingView {
    calls: Arc<Mutex<Vec<ViewCall>>>,
    recorded: Arc<watch::Sender<usize>>,
}

impl RecordingView {
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::default(),
            recorded: Arc::new(watch::Sender::new(0)),
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ViewCall> {
        lock(&self.calls).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    /// Roles passed to `set_chrome`, oldest first.
    #[must_use]
    pub fn chromes(&self) -> Vec<Role> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::Chrome(role) => Some(role),
                _ => None,
            })
            .collect()
    }

    /// `(role, product ids)` of every render, oldest first.
    #[must_use]
    pub fn renders(&self) -> Vec<(Role, Vec<ProductId>)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::Render { role, ids } => Some((role, ids)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last_chrome(&self) -> Option<Role> {
        self.chromes().pop()
    }

    #[must_use]
    pub fn last_render(&self) -> Option<(Role, Vec<ProductId>)> {
        self.renders().pop()
    }

    #[must_use]
    pub fn auth_errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::AuthError(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn catalog_errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::CatalogError(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ViewCall::Notice(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Wait until `renders` renders have been recorded in total.
    pub async fn wait_for_renders(&self, renders: usize) {
        self.wait_until(|view| view.renders().len() >= renders).await;
    }

    /// Wait until `done` holds, re-checking after every recorded call.
    pub async fn wait_until(&self, mut done: impl FnMut(&Self) -> bool) {
        let mut rx = self.recorded.subscribe();
        let waited = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if done(self) {
                    return;
                }
                if rx.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;
        assert!(waited.is_ok(), "view did not reach the expected state: {:?}", self.calls());
    }

    fn record(&self, call: ViewCall) {
        lock(&self.calls).push(call);
        self.recorded.send_modify(|count| *count += 1);
    }
}

impl Default for RecordingView {
    fn default() -> Self {
        Self::new()
    }
}

impl View for RecordingView {
    fn set_chrome(&self, role: Role) {
        self.record(ViewCall::Chrome(role));
    }

    fn render_catalog(&self, role: Role, products: &[Product]) {
        self.record(ViewCall::Render {
            role,
            ids: products.iter().map(|product| product.id).collect(),
        });
    }

    fn show_auth_error(&self, message: &str) {
        self.record(ViewCall::AuthError(message.to_owned()));
    }

    fn show_catalog_error(&self, message: &str) {
        self.record(ViewCall::CatalogError(message.to_owned()));
    }

    fn close_auth_prompt(&self) {
        self.record(ViewCall::CloseAuthPrompt);
    }

    fn clear_auth_error(&self) {
        self.record(ViewCall::ClearAuthError);
    }

    fn show_notice(&self, message: &str) {
        self.record(ViewCall::Notice(message.to_owned()));
    }

    fn open_editor(&self, product: &Product) {
        self.record(ViewCall::OpenEditor(product.id));
    }

    fn close_editor(&self) {
        self.record(ViewCall::CloseEditor);
    }
}
