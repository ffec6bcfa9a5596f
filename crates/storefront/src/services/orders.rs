//! Order Coordinator.
//!
//! Creates the backend order when checkout begins and patches it as the
//! shopper advances. The order returned by the backend is authoritative;
//! nothing about it is computed or mutated locally.

use kitabwale_core::OrderId;
use kitabwale_core::checkout::CheckoutError;
use kitabwale_core::models::{Address, Order, PaymentProof};
use tracing::instrument;

use super::StoreContext;
use crate::backend::{Backend, NewOrder, OrderPatch};
use crate::error::add_breadcrumb;

/// A partial update to an existing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderChange {
    ShippingAddress(Address),
    Payment(PaymentProof),
}

impl OrderChange {
    fn into_patch(self, order_id: OrderId) -> OrderPatch {
        match self {
            Self::ShippingAddress(address) => OrderPatch::shipping_address(order_id, address),
            Self::Payment(proof) => OrderPatch::payment(order_id, proof),
        }
    }
}

/// Order Coordinator.
pub struct OrderCoordinator<'a> {
    backend: &'a dyn Backend,
}

impl<'a> OrderCoordinator<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Create or update the checkout's order.
    ///
    /// Without an order in progress a new one is created from the cart and
    /// its id recorded on the checkout state. With one, `change` is applied
    /// as a patch; with no change the order is simply re-read.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::OrderCreation`] or [`CheckoutError::OrderUpdate`]
    /// when the backend rejects the call.
    pub async fn create_or_update(
        &self,
        ctx: &mut StoreContext,
        change: Option<OrderChange>,
    ) -> Result<Order, CheckoutError> {
        match (ctx.checkout.order_id().cloned(), change) {
            (None, None) => self.create(ctx).await,
            (None, Some(_)) => Err(CheckoutError::NoActiveOrder),
            (Some(order_id), Some(change)) => self.patch(ctx, order_id, change).await,
            (Some(order_id), None) => {
                let credential = ctx
                    .credential()
                    .map_err(|e| CheckoutError::OrderUpdate(e.user_message().to_string()))?;
                self.backend
                    .order(&credential, &order_id)
                    .await
                    .map_err(|e| CheckoutError::OrderUpdate(e.user_message().to_string()))
            }
        }
    }

    /// Create an order from the current cart snapshot and total.
    ///
    /// On success the checkout moves to the address step. On failure it
    /// stays at the cart step.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::EmptyCart`] for an empty cart, otherwise
    /// [`CheckoutError::OrderCreation`].
    #[instrument(skip(self, ctx))]
    pub async fn create(&self, ctx: &mut StoreContext) -> Result<Order, CheckoutError> {
        ctx.checkout.ensure_can_begin(ctx.cart.is_empty())?;
        let credential = ctx
            .credential()
            .map_err(|e| CheckoutError::OrderCreation(e.user_message().to_string()))?;

        let request = NewOrder {
            items: ctx.cart.order_items(),
            total_amount: ctx.cart.summary().final_amount,
        };
        let order = self
            .backend
            .create_order(&credential, &request)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Order creation failed");
                CheckoutError::OrderCreation(e.user_message().to_string())
            })?;

        ctx.checkout.order_created(order.id.clone());
        add_breadcrumb("checkout", "Order created", Some(&[("order_id", order.id.as_str())]));
        Ok(order)
    }

    /// Apply a partial update to `order_id`.
    ///
    /// The checkout state is not touched; callers record the outcome.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::OrderUpdate`] when the backend rejects the patch.
    #[instrument(skip(self, ctx, change), fields(order_id = %order_id))]
    pub async fn patch(
        &self,
        ctx: &StoreContext,
        order_id: OrderId,
        change: OrderChange,
    ) -> Result<Order, CheckoutError> {
        let credential = ctx
            .credential()
            .map_err(|e| CheckoutError::OrderUpdate(e.user_message().to_string()))?;
        let patch = change.into_patch(order_id);
        self.backend
            .patch_order(&credential, &patch)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Order update failed");
                CheckoutError::OrderUpdate(e.user_message().to_string())
            })
    }
}
