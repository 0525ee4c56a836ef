//! Account registration.

use secrecy::SecretString;

use arenza_storefront::ClientConfig;

use super::{CommandError, Credentials, Storefront};

/// Register a customer account.
///
/// Projects that confirm emails leave the user signed out until the link in
/// the confirmation email is followed.
pub async fn create_account(config: &ClientConfig, credentials: Credentials) -> Result<(), CommandError> {
    let storefront = Storefront::connect(config).await?;

    let password = SecretString::from(credentials.password);
    let result = storefront
        .controller()
        .sign_up(&credentials.email, &password)
        .await
        .map_err(CommandError::from);

    storefront.close().await;
    result
}
