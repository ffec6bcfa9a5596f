//! Wishlist mutations.

use kitabwale_core::ProductId;
use tracing::instrument;

use super::StoreContext;
use crate::backend::{Backend, BackendError};

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistChange {
    Added,
    Removed,
    Unchanged,
}

/// Wishlist service.
pub struct WishlistService<'a> {
    backend: &'a dyn Backend,
}

impl<'a> WishlistService<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Add a book to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the shopper is signed out or the backend rejects
    /// the call.
    #[instrument(skip(self, ctx), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        ctx: &mut StoreContext,
        product_id: &ProductId,
    ) -> Result<WishlistChange, BackendError> {
        let credential = ctx.credential()?;
        let wishlist = self.backend.add_to_wishlist(&credential, product_id).await?;
        ctx.wishlist.replace(wishlist);
        Ok(WishlistChange::Added)
    }

    /// Remove a book from the wishlist.
    ///
    /// Removing a book that is not wishlisted makes no backend call and
    /// leaves the mirror untouched.
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
    ) -> Result<WishlistChange, BackendError> {
        if !ctx.wishlist.needs_removal(product_id) {
            return Ok(WishlistChange::Unchanged);
        }
        let credential = ctx.credential()?;
        let wishlist = self
            .backend
            .remove_from_wishlist(&credential, product_id)
            .await?;
        ctx.wishlist.replace(wishlist);
        Ok(WishlistChange::Removed)
    }

    /// Add when absent, remove when present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the call.
    pub async fn toggle(
        &self,
        ctx: &mut StoreContext,
        product_id: &ProductId,
    ) -> Result<WishlistChange, BackendError> {
        if ctx.wishlist.contains(product_id) {
            self.remove(ctx, product_id).await
        } else {
            self.add(ctx, product_id).await
        }
    }
}
