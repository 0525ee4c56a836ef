//! Catalog listing.
//!
//! # Usage
//!
//! ```bash
//! # As a guest
//! arenza catalog
//!
//! # As a signed-in user
//! arenza catalog -e cliente@example.com -p '...'
//! ```

use arenza_storefront::ClientConfig;

use super::{CommandError, OptionalCredentials, Storefront};

/// Print every product in the catalog.
pub async fn list(config: &ClientConfig, credentials: OptionalCredentials) -> Result<(), CommandError> {
    let mut storefront = Storefront::connect(config).await?;

    let result = match credentials.into_credentials() {
        Some(credentials) => match storefront.sign_in(&credentials).await {
            Ok(_) => storefront.show_catalog().await,
            Err(e) => Err(e),
        },
        None => storefront.show_catalog().await,
    };

    storefront.close().await;
    result
}
