//! Product management for the store administrator.
//!
//! Every command signs in, waits for the admin session to reach the
//! controller, loads the catalog and then performs the mutation.

use arenza_core::{ProductId, ProductInput};
use arenza_storefront::{ActionOutcome, ClientConfig};

use super::{CommandError, Credentials, ProductFields, ProductPatch, Storefront};

/// Add a product.
pub async fn add(
    config: &ClientConfig,
    credentials: Credentials,
    fields: ProductFields,
) -> Result<(), CommandError> {
    let input = ProductInput {
        name: fields.name,
        price: fields.price,
        description: fields.description,
        image: fields.image,
    };

    let storefront = admin_storefront(config, &credentials).await?;
    let result = match storefront.controller().create_product(input).await {
        Ok(outcome) => check_outcome(outcome, None),
        Err(e) => Err(e.into()),
    };

    storefront.close().await;
    result
}

/// Change the given fields of product `id`.
pub async fn update(
    config: &ClientConfig,
    credentials: Credentials,
    id: ProductId,
    patch: ProductPatch,
) -> Result<(), CommandError> {
    let storefront = admin_storefront(config, &credentials).await?;
    let result = edit(&storefront, id, patch).await;

    storefront.close().await;
    result
}

async fn edit(storefront: &Storefront, id: ProductId, patch: ProductPatch) -> Result<(), CommandError> {
    let controller = storefront.controller();
    check_outcome(controller.open_editor(id).await, Some(id))?;

    let mut input = controller
        .find_product(id)
        .await
        .ok_or(CommandError::ProductNotFound(id))?
        .to_input();
    apply_patch(&mut input, patch);

    let outcome = controller.request_edit(id, input).await?;
    check_outcome(outcome, Some(id))
}

/// Delete product `id`.
pub async fn delete(
    config: &ClientConfig,
    credentials: Credentials,
    id: ProductId,
) -> Result<(), CommandError> {
    let storefront = admin_storefront(config, &credentials).await?;
    let result = match storefront.controller().request_delete(id).await {
        Ok(outcome) => check_outcome(outcome, Some(id)),
        Err(e) => Err(e.into()),
    };

    storefront.close().await;
    result
}

/// Connect, sign in as the administrator and load the catalog.
async fn admin_storefront(
    config: &ClientConfig,
    credentials: &Credentials,
) -> Result<Storefront, CommandError> {
    let mut storefront = Storefront::connect(config).await?;

    let ready = match storefront.sign_in_admin(credentials).await {
        Ok(()) => storefront.load_catalog().await,
        Err(e) => Err(e),
    };

    match ready {
        Ok(()) => Ok(storefront),
        Err(e) => {
            storefront.close().await;
            Err(e)
        }
    }
}

fn apply_patch(input: &mut ProductInput, patch: ProductPatch) {
    if let Some(name) = patch.name {
        input.name = name;
    }
    if let Some(price) = patch.price {
        input.price = price;
    }
    if let Some(description) = patch.description {
        input.description = description;
    }
    if let Some(image) = patch.image {
        input.image = image;
    }
}

fn check_outcome(outcome: ActionOutcome, id: Option<ProductId>) -> Result<(), CommandError> {
    match (outcome, id) {
        (ActionOutcome::Applied, _) => Ok(()),
        (ActionOutcome::NotCached, Some(id)) => Err(CommandError::ProductNotFound(id)),
        (ActionOutcome::NotCached | ActionOutcome::Forbidden, _) => Err(CommandError::Forbidden),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arenza_core::Price;

    fn input() -> ProductInput {
        ProductInput {
            name: "Biquíni Lua".to_owned(),
            price: Price::parse("149,90").unwrap_or(Price::ZERO),
            description: "UV".to_owned(),
            image: "https://cdn/lua.jpg".to_owned(),
        }
    }

    #[test]
    fn test_apply_patch_keeps_omitted_fields() {
        let mut product = input();
        apply_patch(
            &mut product,
            ProductPatch {
                name: None,
                price: Price::parse("99").ok(),
                description: None,
                image: None,
            },
        );
        assert_eq!(product.name, "Biquíni Lua");
        assert_eq!(product.price.display_brl(), "R$ 99,00");
        assert_eq!(product.image, "https://cdn/lua.jpg");
    }

    #[test]
    fn test_check_outcome() {
        let id = ProductId::new(7);
        assert!(check_outcome(ActionOutcome::Applied, Some(id)).is_ok());
        assert!(matches!(
            check_outcome(ActionOutcome::NotCached, Some(id)),
            Err(CommandError::ProductNotFound(found)) if found == id
        ));
        assert!(matches!(
            check_outcome(ActionOutcome::Forbidden, Some(id)),
            Err(CommandError::Forbidden)
        ));
    }
}
