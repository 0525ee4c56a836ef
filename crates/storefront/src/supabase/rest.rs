//! PostgREST requests against the `products` table.

use reqwest::RequestBuilder;
use tracing::instrument;
use url::Url;

use arenza_core::{Product, ProductId, ProductInput};

use super::error_message;
use crate::error::BackendError;

const PRODUCTS: &str = "rest/v1/products";

/// All products, ascending by id.
///
/// # Errors
///
/// Returns `BackendError::Api` for non-success responses and
/// `BackendError::Parse` if a row does not match [`Product`].
#[instrument(skip_all)]
pub async fn list_products(
    client: &reqwest::Client,
    base: &Url,
    bearer: &str,
) -> Result<Vec<Product>, BackendError> {
    let mut url = products_url(base)?;
    url.query_pairs_mut()
        .append_pair("select", "*")
        .append_pair("order", "id.asc");

    let response = check(client.get(url).bearer_auth(bearer)).await?;
    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

/// Insert a product.
///
/// # Errors
///
/// Returns `BackendError::Api` if the backend rejects the row.
#[instrument(skip_all, fields(name = %input.name))]
pub async fn insert_product(
    client: &reqwest::Client,
    base: &Url,
    bearer: &str,
    input: &ProductInput,
) -> Result<(), BackendError> {
    let url = products_url(base)?;
    check(
        client
            .post(url)
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal")
            .json(input),
    )
    .await?;
    Ok(())
}

/// Replace the editable fields of product `id`.
///
/// # Errors
///
/// Returns `BackendError::Api` if the backend rejects the update.
#[instrument(skip(client, base, bearer, input))]
pub async fn update_product(
    client: &reqwest::Client,
    base: &Url,
    bearer: &str,
    id: ProductId,
    input: &ProductInput,
) -> Result<(), BackendError> {
    let url = product_url(base, id)?;
    check(
        client
            .patch(url)
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal")
            .json(input),
    )
    .await?;
    Ok(())
}

/// Delete product `id`.
///
/// # Errors
///
/// Returns `BackendError::Api` if the backend rejects the delete.
#[instrument(skip(client, base, bearer))]
pub async fn delete_product(
    client: &reqwest::Client,
    base: &Url,
    bearer: &str,
    id: ProductId,
) -> Result<(), BackendError> {
    let url = product_url(base, id)?;
    check(
        client
            .delete(url)
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal"),
    )
    .await?;
    Ok(())
}

/// Send `request` and turn non-success statuses into `BackendError::Api`.
async fn check(request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(response)
}

fn products_url(base: &Url) -> Result<Url, BackendError> {
    base.join(PRODUCTS)
        .map_err(|e| BackendError::Parse(format!("invalid catalog URL: {e}")))
}

fn product_url(base: &Url, id: ProductId) -> Result<Url, BackendError> {
    let mut url = products_url(base)?;
    url.query_pairs_mut()
        .append_pair("id", &format!("eq.{id}"));
    Ok(url)
}
