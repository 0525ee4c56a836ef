//! Arenza CLI - browse and manage the storefront catalog from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List products as a guest
//! arenza catalog
//!
//! # Create an account
//! arenza signup --email cliente@example.com --password '...'
//!
//! # Manage products as the store administrator
//! export ARENZA_EMAIL=admin@arenza.com.br ARENZA_PASSWORD='...'
//! arenza product add --name "Biquíni Lua" --price 149,90 --image https://cdn/lua.jpg
//! arenza product update 12 --price 129,90
//! arenza product delete 12
//! ```
//!
//! Configuration is read from the environment (see `arenza_storefront::config`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arenza_core::ProductId;
use arenza_storefront::{ClientConfig, ConfigSource, resolve_config};

mod commands;
mod view;

use commands::{CommandError, Credentials, OptionalCredentials, ProductFields, ProductPatch};

#[derive(Parser)]
#[command(name = "arenza")]
#[command(author, version, about = "Arenza storefront client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the catalog
    Catalog {
        #[command(flatten)]
        credentials: OptionalCredentials,
    },
    /// Create a customer account
    Signup {
        #[command(flatten)]
        credentials: Credentials,
    },
    /// Manage products (administrator only)
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Add a product
    Add {
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Change fields of an existing product
    Update {
        /// Product ID
        id: ProductId,
        #[command(flatten)]
        credentials: Credentials,
        #[command(flatten)]
        patch: ProductPatch,
    },
    /// Delete a product
    Delete {
        /// Product ID
        id: ProductId,
        #[command(flatten)]
        credentials: Credentials,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration comes first so Sentry can be initialized before any event.
    let config = match ConfigSource::from_env() {
        Ok(source) => resolve_config(&source).await,
        Err(e) => Err(e),
    };
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "arenza_cli=info,arenza_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CommandError> {
    match cli.command {
        Commands::Catalog { credentials } => commands::catalog::list(config, credentials).await,
        Commands::Signup { credentials } => commands::signup::create_account(config, credentials).await,
        Commands::Product { action } => match action {
            ProductAction::Add {
                credentials,
                fields,
            } => commands::product::add(config, credentials, fields).await,
            ProductAction::Update {
                id,
                credentials,
                patch,
            } => commands::product::update(config, credentials, id, patch).await,
            ProductAction::Delete { id, credentials } => {
                commands::product::delete(config, credentials, id).await
            }
        },
    }
}
