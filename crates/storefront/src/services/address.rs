//! Address Resolver.
//!
//! Supplies shipping addresses from the user's address book and attaches
//! the chosen one to the in-progress order through the Order Coordinator.

use kitabwale_core::AddressId;
use kitabwale_core::checkout::{CheckoutError, CheckoutStep};
use kitabwale_core::models::{Address, Order};
use kitabwale_core::validation::ValidAddress;
use tracing::instrument;

use super::StoreContext;
use super::orders::{OrderChange, OrderCoordinator};
use crate::backend::{Backend, BackendError};
use crate::error::add_breadcrumb;

/// Address Resolver.
pub struct AddressResolver<'a> {
    backend: &'a dyn Backend,
}

impl<'a> AddressResolver<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// The shopper's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn list(&self, ctx: &StoreContext) -> Result<Vec<Address>, BackendError> {
        let credential = ctx.credential()?;
        self.backend.addresses(&credential).await
    }

    /// Create or update an address-book entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the address.
    #[instrument(skip(self, ctx, address))]
    pub async fn save(
        &self,
        ctx: &StoreContext,
        address: &ValidAddress,
    ) -> Result<Address, BackendError> {
        let credential = ctx.credential()?;
        self.backend.save_address(&credential, address).await
    }

    /// Ship the in-progress order to `address`.
    ///
    /// The order is patched first; the selection is recorded only once the
    /// backend accepts it.
    ///
    /// # Errors
    ///
    /// Fails outside the address step, without an order, or with
    /// [`CheckoutError::OrderUpdate`] when the patch is rejected.
    #[instrument(skip(self, ctx, address), fields(address_id = %address.id))]
    pub async fn select(
        &self,
        ctx: &mut StoreContext,
        address: Address,
    ) -> Result<Order, CheckoutError> {
        ctx.checkout.ensure_at(CheckoutStep::Address)?;
        let order_id = ctx.checkout.active_order()?.clone();
        let address_id = address.id.clone();

        let order = OrderCoordinator::new(self.backend)
            .patch(ctx, order_id, OrderChange::ShippingAddress(address))
            .await?;

        ctx.checkout.address_selected(address_id)?;
        add_breadcrumb("checkout", "Shipping address selected", None);
        Ok(order)
    }

    /// Select a saved address by id.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::MissingAddress`] when the id is not in the address
    /// book, otherwise as [`Self::select`].
    pub async fn select_saved(
        &self,
        ctx: &mut StoreContext,
        address_id: &AddressId,
    ) -> Result<Order, CheckoutError> {
        let address = self
            .list(ctx)
            .await
            .map_err(|e| CheckoutError::OrderUpdate(e.user_message().to_string()))?
            .into_iter()
            .find(|address| address.id == *address_id)
            .ok_or(CheckoutError::MissingAddress)?;
        self.select(ctx, address).await
    }

    /// Save a new address and ship the order there.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::OrderUpdate`] if saving or patching fails.
    pub async fn save_and_select(
        &self,
        ctx: &mut StoreContext,
        address: &ValidAddress,
    ) -> Result<Order, CheckoutError> {
        ctx.checkout.ensure_at(CheckoutStep::Address)?;
        let saved = self
            .save(ctx, address)
            .await
            .map_err(|e| CheckoutError::OrderUpdate(e.user_message().to_string()))?;
        self.select(ctx, saved).await
    }
}
