//! Terminal presentation of controller instructions.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use arenza_core::{Product, Role};
use arenza_storefront::View;

/// Writes notices, errors and the catalog to the terminal, and publishes the
/// current chrome so commands can wait for a session change to land.
pub struct TerminalView {
    chrome: watch::Sender<Role>,
    print_next_render: Arc<AtomicBool>,
}

/// Command-side handle to a [`TerminalView`] owned by the controller.
pub struct ViewHandle {
    chrome: watch::Receiver<Role>,
    print_next_render: Arc<AtomicBool>,
}

impl TerminalView {
    #[must_use]
    pub fn channel() -> (Self, ViewHandle) {
        let (chrome, rx) = watch::channel(Role::Guest);
        let print_next_render = Arc::new(AtomicBool::new(false));
        (
            Self {
                chrome,
                print_next_render: Arc::clone(&print_next_render),
            },
            ViewHandle {
                chrome: rx,
                print_next_render,
            },
        )
    }
}

impl ViewHandle {
    /// Wait until the chrome shows a role matching `accept`, returning it.
    ///
    /// `None` if that does not happen within `limit`.
    pub async fn wait_for_chrome(
        &mut self,
        limit: Duration,
        accept: impl FnMut(&Role) -> bool,
    ) -> Option<Role> {
        match tokio::time::timeout(limit, self.chrome.wait_for(accept)).await {
            Ok(Ok(role)) => Some(*role),
            Ok(Err(_)) | Err(_) => None,
        }
    }

    /// Print the next catalog render. Renders are silent otherwise.
    pub fn print_next_render(&self) {
        self.print_next_render.store(true, Ordering::SeqCst);
    }
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
impl View for TerminalView {
    fn set_chrome(&self, role: Role) {
        tracing::debug!(%role, "chrome updated");
        self.chrome.send_replace(role);
    }

    fn render_catalog(&self, role: Role, products: &[Product]) {
        tracing::debug!(%role, count = products.len(), "catalog rendered");
        if self.print_next_render.swap(false, Ordering::SeqCst) {
            print!("{}", format_catalog(role, products));
        }
    }

    fn show_auth_error(&self, message: &str) {
        eprintln!("auth: {message}");
    }

    fn show_catalog_error(&self, message: &str) {
        eprintln!("catalog: {message}");
    }

    fn close_auth_prompt(&self) {}

    fn show_notice(&self, message: &str) {
        println!("{message}");
    }

    fn open_editor(&self, product: &Product) {
        print!("Editing:\n{}", format_card(product));
    }
}

/// Product cards, with the admin commands when `role` is admin.
fn format_catalog(role: Role, products: &[Product]) -> String {
    if products.is_empty() {
        return "No products yet.\n".to_owned();
    }

    let mut out = String::new();
    for product in products {
        out.push_str(&format_card(product));
        if role.is_admin() {
            let _ = writeln!(
                out,
                "       edit: arenza product update {id}  delete: arenza product delete {id}",
                id = product.id
            );
        }
    }
    out
}

fn format_card(product: &Product) -> String {
    let mut out = format!(
        "#{:<5} {}  {}\n",
        product.id,
        product.name,
        product.price.display_brl()
    );
    if !product.description.is_empty() {
        let _ = writeln!(out, "       {}", product.description);
    }
    if !product.image.is_empty() {
        let _ = writeln!(out, "       {}", product.image);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arenza_core::{Price, ProductId};

    fn lua() -> Product {
        Product {
            id: ProductId::new(12),
            name: "Biquíni Lua".to_owned(),
            price: Price::parse("1234,5").unwrap(),
            description: String::new(),
            image: String::new(),
        }
    }

    #[test]
    fn test_admin_render_lists_actions() {
        let text = format_catalog(Role::Admin, &[lua()]);
        assert!(text.contains("R$ 1.234,50"));
        assert!(text.contains("arenza product delete 12"));
    }

    #[test]
    fn test_guest_render_hides_actions() {
        let text = format_catalog(Role::Guest, &[lua()]);
        assert!(text.starts_with("#12"));
        assert!(!text.contains("arenza product"));
        assert_eq!(format_catalog(Role::Guest, &[]), "No products yet.\n");
    }

    #[test]
    fn test_only_armed_render_is_printed() {
        let (view, handle) = TerminalView::channel();
        view.render_catalog(Role::Guest, &[]);
        assert!(!handle.print_next_render.load(Ordering::SeqCst));

        handle.print_next_render();
        view.render_catalog(Role::Guest, &[]);
        assert!(!handle.print_next_render.load(Ordering::SeqCst));
    }
}
