//! Cart mutations.
//!
//! Each call maps to one backend endpoint and the mirror is replaced with
//! the backend's response. A cart change during checkout invalidates the
//! in-progress order snapshot.

use kitabwale_core::ProductId;
use tracing::instrument;

use super::StoreContext;
use crate::backend::{Backend, BackendError};
use crate::error::add_breadcrumb;

/// Cart service.
pub struct CartService<'a> {
    backend: &'a dyn Backend,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Add `quantity` copies of a book.
    ///
    /// # Errors
    ///
    /// Returns an error if the shopper is signed out or the backend rejects
    /// the call. The mirror is unchanged on error.
    #[instrument(skip(self, ctx), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        ctx: &mut StoreContext,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let credential = ctx.credential()?;
        let cart = self
            .backend
            .add_to_cart(&credential, product_id, quantity.max(1))
            .await?;
        ctx.cart.replace(cart);
        ctx.checkout.cart_changed();
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));
        Ok(())
    }

    /// Remove a book from the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the shopper is signed out or the backend rejects
    /// the call.
    #[instrument(skip(self, ctx), fields(product_id = %product_id))]
    pub async fn remove(
        &self,
        ctx: &mut StoreContext,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let credential = ctx.credential()?;
        let cart = self.backend.remove_from_cart(&credential, product_id).await?;
        ctx.cart.replace(cart);
        ctx.checkout.cart_changed();
        add_breadcrumb(
            "cart",
            "Removed from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
        Ok(())
    }
}
