//! CLI command implementations.

pub mod catalog;
pub mod product;
pub mod signup;

use clap::Args;
use secrecy::SecretString;
use thiserror::Error;

use arenza_core::{Price, ProductId, Role};
use arenza_storefront::{
    AuthError, BackendError, ClientConfig, ConfigurationError, SessionController, SupabaseClient,
};

use crate::view::{TerminalView, ViewHandle};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Sign-in, sign-up or sign-out failed.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// A catalog request failed.
    #[error("Catalog request failed: {0}")]
    Backend(#[from] BackendError),

    /// The session change did not reach the controller in time.
    #[error("Timed out waiting for the session to change")]
    SessionTimeout,

    /// Signed in, but not as the store administrator.
    #[error("{0} is not the store administrator")]
    NotAdmin(String),

    /// No product with this ID in the catalog.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The controller refused the action for the current role.
    #[error("Action not permitted for the current session")]
    Forbidden,
}

/// Email and password for commands that require a signed-in user.
#[derive(Args)]
pub struct Credentials {
    /// Account email
    #[arg(short, long, env = "ARENZA_EMAIL")]
    pub email: String,

    /// Account password
    #[arg(short, long, env = "ARENZA_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Credentials for commands that also work as a guest.
#[derive(Args)]
pub struct OptionalCredentials {
    /// Account email (browse as a guest when omitted)
    #[arg(short, long, env = "ARENZA_EMAIL", requires = "password")]
    pub email: Option<String>,

    /// Account password
    #[arg(short, long, env = "ARENZA_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl OptionalCredentials {
    fn into_credentials(self) -> Option<Credentials> {
        Some(Credentials {
            email: self.email?,
            password: self.password?,
        })
    }
}

/// Fields of a new product.
#[derive(Args)]
pub struct ProductFields {
    /// Product name
    #[arg(long)]
    pub name: String,

    /// Price in reais (`149,90` or `149.90`)
    #[arg(long)]
    pub price: Price,

    /// Description shown on the product card
    #[arg(long, default_value = "")]
    pub description: String,

    /// Image URL
    #[arg(long, default_value = "")]
    pub image: String,
}

/// Fields to change on an existing product; omitted fields keep their value.
#[derive(Args)]
pub struct ProductPatch {
    /// New name
    #[arg(long)]
    pub name: Option<String>,

    /// New price in reais
    #[arg(long)]
    pub price: Option<Price>,

    /// New description
    #[arg(long)]
    pub description: Option<String>,

    /// New image URL
    #[arg(long)]
    pub image: Option<String>,
}

type Controller = SessionController<SupabaseClient, SupabaseClient, TerminalView>;

/// A started controller wired to the Supabase backend and the terminal.
pub struct Storefront {
    controller: Controller,
    view: ViewHandle,
    config: ClientConfig,
}

impl Storefront {
    /// Build the backend client and start the controller.
    pub async fn connect(config: &ClientConfig) -> Result<Self, CommandError> {
        let client = SupabaseClient::new(&config.supabase)?;
        let (terminal, view) = TerminalView::channel();
        let controller =
            SessionController::new(client.clone(), client, terminal, config.backend_timeout);
        controller.start(config.admin_email.clone()).await?;

        Ok(Self {
            controller,
            view,
            config: config.clone(),
        })
    }

    pub const fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Sign in and wait for the controller to pick up the new session.
    pub async fn sign_in(&mut self, credentials: &Credentials) -> Result<Role, CommandError> {
        let password = SecretString::from(credentials.password.clone());
        self.controller.sign_in(&credentials.email, &password).await?;

        let role = self
            .view
            .wait_for_chrome(self.config.backend_timeout, |role| role.is_signed_in())
            .await
            .ok_or(CommandError::SessionTimeout)?;
        tracing::info!(%role, "session active");
        Ok(role)
    }

    /// Sign in and require the administrator role.
    pub async fn sign_in_admin(&mut self, credentials: &Credentials) -> Result<(), CommandError> {
        if self.sign_in(credentials).await?.is_admin() {
            Ok(())
        } else {
            Err(CommandError::NotAdmin(credentials.email.clone()))
        }
    }

    /// Fetch the catalog for the current session.
    pub async fn load_catalog(&self) -> Result<(), CommandError> {
        self.controller.refresh_catalog().await?;
        Ok(())
    }

    /// Fetch the catalog and print it as rendered for the current role.
    pub async fn show_catalog(&self) -> Result<(), CommandError> {
        self.view.print_next_render();
        self.load_catalog().await
    }

    /// Sign out if signed in, then stop the controller.
    ///
    /// The backend revokes only this client's session.
    pub async fn close(self) {
        if self.controller.current_role().await.is_signed_in()
            && let Err(e) = self.controller.sign_out().await
        {
            tracing::warn!(error = %e, "sign-out on exit failed");
        }
        self.controller.shutdown().await;
    }
}
