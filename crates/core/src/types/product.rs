//! Catalog product records.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product row as the catalog backend returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Stable, unique identifier assigned by the backend.
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    /// Image URL shown on the product card.
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// The editable fields of this product, e.g. to pre-fill an edit form.
    #[must_use]
    pub fn to_input(&self) -> ProductInput {
        ProductInput {
            name: self.name.clone(),
            price: self.price,
            description: self.description.clone(),
            image: self.image.clone(),
        }
    }
}

/// Fields submitted when creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub price: Price,
    pub description: String,
    pub image: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_row() {
        let json = r#"{
            "id": 12,
            "name": "Biquíni Lua",
            "price": 149.9,
            "description": "Tecido com proteção UV",
            "image": "https://cdn.arenza.com.br/lua.jpg",
            "created_at": "2024-11-02T12:00:00+00:00"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, ProductId::new(12));
        assert_eq!(product.price.display_brl(), "R$ 149,90");
    }

    #[test]
    fn test_missing_optional_text_defaults_to_empty() {
        let product: Product =
            serde_json::from_str(r#"{"id": 1, "name": "Saída", "price": "0"}"#).unwrap();
        assert!(product.description.is_empty());
        assert!(product.image.is_empty());
    }

    #[test]
    fn test_to_input_drops_identifier() {
        let product = Product {
            id: ProductId::new(5),
            name: "Maiô".to_owned(),
            price: Price::parse("199,00").unwrap(),
            description: "Preto".to_owned(),
            image: "https://cdn/maio.jpg".to_owned(),
        };
        let json = serde_json::to_value(product.to_input()).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["name"], "Maiô");
    }
}
