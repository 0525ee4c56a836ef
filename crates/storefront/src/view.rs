//! Presentation instructions emitted by the session controller.
//!
//! A `View` only receives borrowed snapshots; it never owns or mutates the
//! controller's session or product cache.

use arenza_core::{Product, Role};

/// A presentation layer driven declaratively by the controller.
///
/// Calls are made synchronously from the controller's task, sometimes while
/// the controller holds its state lock. Implementations must not call back
/// into the controller.
pub trait View: Send + Sync + 'static {
    /// Show or hide role-dependent chrome (login/logout links, admin panel).
    fn set_chrome(&self, role: Role);

    /// Render product cards. Edit/delete affordances only when `role` is admin.
    fn render_catalog(&self, role: Role, products: &[Product]);

    /// Error line inside the auth prompt.
    fn show_auth_error(&self, message: &str);

    /// Error line for catalog operations.
    fn show_catalog_error(&self, message: &str);

    /// Dismiss the sign-in/sign-up prompt.
    fn close_auth_prompt(&self);

    /// Hide the auth prompt's error line.
    fn clear_auth_error(&self) {}

    /// Informational message, e.g. after a successful mutation.
    fn show_notice(&self, _message: &str) {}

    /// Open the edit prompt pre-filled with `product`.
    fn open_editor(&self, _product: &Product) {}

    /// Dismiss the edit prompt.
    fn close_editor(&self) {}
}
