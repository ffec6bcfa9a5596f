//! Shopping cart as stored by the backend.

use serde::{Deserialize, Serialize};

use crate::models::Product;
use crate::types::{CartId, CartItemId, ProductId};

/// The user's cart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartId>,
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl Cart {
    /// Total number of books across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a line for the given product exists.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.items.iter().any(|item| &item.product.id == product_id)
    }
}

/// A cart line. The backend always populates the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CartItemId>,
    pub product: Product,
    pub quantity: u32,
}
