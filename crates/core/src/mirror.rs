//! Session-local mirrors of the backend cart and wishlist.
//!
//! Mirrors never change on their own: every mutation is a backend call, and
//! the mirror is then replaced with whatever the backend returned.

use serde::{Deserialize, Serialize};

use crate::models::{Cart, CartItem, OrderItem, Product, Wishlist};
use crate::pricing::PriceSummary;
use crate::types::ProductId;

/// Mirror of the user's backend cart.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CartStore {
    cart: Cart,
}

impl CartStore {
    #[must_use]
    pub const fn new(cart: Cart) -> Self {
        Self { cart }
    }

    /// Replace local contents with a confirmed backend response.
    pub fn replace(&mut self, cart: Cart) {
        self.cart = cart;
    }

    /// Drop all lines. Only called once an order is finalized.
    pub fn clear(&mut self) {
        self.cart = Cart::default();
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.cart.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart.item_count()
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.cart.contains(product_id)
    }

    #[must_use]
    pub fn summary(&self) -> PriceSummary {
        PriceSummary::for_items(&self.cart.items)
    }

    /// Lines to snapshot into a new order.
    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.cart.items.iter().map(OrderItem::from).collect()
    }
}

/// Mirror of the user's backend wishlist.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WishlistStore {
    wishlist: Wishlist,
}

impl WishlistStore {
    #[must_use]
    pub const fn new(wishlist: Wishlist) -> Self {
        Self { wishlist }
    }

    pub fn replace(&mut self, wishlist: Wishlist) {
        self.wishlist = wishlist;
    }

    pub fn clear(&mut self) {
        self.wishlist = Wishlist::default();
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.wishlist.contains(product_id)
    }

    /// Whether removing `product_id` needs a backend call at all.
    ///
    /// Removing a book that is not on the list is a no-op.
    #[must_use]
    pub fn needs_removal(&self, product_id: &ProductId) -> bool {
        self.contains(product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.wishlist.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wishlist.is_empty()
    }

    /// Wishlisted books the backend populated.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.wishlist.populated()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::ProductRef;
    use crate::types::Price;

    fn cart_json() -> Cart {
        serde_json::from_str(
            r#"{"_id":"c1","items":[{"_id":"i1","quantity":2,"product":{
                "_id":"p1","title":"Concepts of Physics","price":300,"finalPrice":250,
                "shippingCharge":"free"}}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_cart_store_replace_and_clear() {
        let mut store = CartStore::default();
        assert!(store.is_empty());

        store.replace(cart_json());
        assert_eq!(store.item_count(), 2);
        assert!(store.contains(&ProductId::new("p1")));
        assert_eq!(store.summary().final_amount, Price::rupees(500));
        assert_eq!(store.order_items().len(), 1);

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn test_wishlist_removal_of_absent_book_is_noop() {
        let store = WishlistStore::new(Wishlist {
            id: None,
            products: vec![ProductRef::Id(ProductId::new("p1"))],
        });
        assert!(store.needs_removal(&ProductId::new("p1")));
        assert!(!store.needs_removal(&ProductId::new("p9")));
        assert_eq!(store.len(), 1);
        assert_eq!(store.products().count(), 0);
    }

    #[test]
    fn test_mirrors_survive_session_serialization() {
        let store = CartStore::new(cart_json());
        let json = serde_json::to_string(&store).unwrap();
        let back: CartStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
