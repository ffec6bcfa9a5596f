//! Saved-for-later books.

use serde::{Deserialize, Serialize};

use crate::models::{Product, ProductRef};
use crate::types::{ProductId, WishlistId};

/// The user's wishlist.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Wishlist {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WishlistId>,
    #[serde(default)]
    pub products: Vec<ProductRef>,
}

impl Wishlist {
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.products.iter().any(|entry| entry.id() == product_id)
    }

    /// Populated products only; bare ids are skipped.
    pub fn populated(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter_map(ProductRef::product)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
