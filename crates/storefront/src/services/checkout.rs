//! Checkout orchestration.
//!
//! Drives `cart → address → payment → success` over the Order Coordinator,
//! Address Resolver and Payment Initiator. Each step calls the backend
//! first and records the outcome on the checkout state only on success.

use kitabwale_core::OrderId;
use kitabwale_core::checkout::{CheckoutError, CheckoutStep};
use tracing::instrument;

use super::StoreContext;
use super::orders::{OrderChange, OrderCoordinator};
use super::payment::{PaymentInitiator, PaymentWidget, WidgetOptions, WidgetOutcome};
use crate::backend::Backend;
use crate::config::PaymentConfig;
use crate::error::add_breadcrumb;

/// Result of a "Proceed" action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProceedOutcome {
    /// The flow advanced to this step.
    MovedTo(CheckoutStep),
    /// The payment widget should be opened with these options.
    OpenWidget(WidgetOptions),
}

/// How a payment attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The order is paid and confirmed. Cart and checkout are cleared.
    Paid(OrderId),
    /// The widget was closed. Nothing changed.
    Dismissed,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    backend: &'a dyn Backend,
    payment: &'a PaymentConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend, payment: &'a PaymentConfig) -> Self {
        Self { backend, payment }
    }

    /// Advance from the current step.
    ///
    /// - cart: creates the order, then moves to address.
    /// - address: moves to payment once an address is selected.
    /// - payment: starts a payment session for the widget.
    ///
    /// # Errors
    ///
    /// The step's [`CheckoutError`]; the flow stays where it was.
    #[instrument(skip(self, ctx), fields(step = %ctx.checkout.step()))]
    pub async fn proceed(&self, ctx: &mut StoreContext) -> Result<ProceedOutcome, CheckoutError> {
        match ctx.checkout.step() {
            CheckoutStep::Cart => {
                OrderCoordinator::new(self.backend).create(ctx).await?;
                Ok(ProceedOutcome::MovedTo(CheckoutStep::Address))
            }
            CheckoutStep::Address => {
                ctx.checkout.proceed_to_payment()?;
                add_breadcrumb("checkout", "Moved to payment", None);
                Ok(ProceedOutcome::MovedTo(CheckoutStep::Payment))
            }
            CheckoutStep::Payment => self.open_payment(ctx).await.map(ProceedOutcome::OpenWidget),
        }
    }

    /// Explicit "Go Back".
    ///
    /// # Errors
    ///
    /// Fails at the cart step.
    pub fn go_back(&self, ctx: &mut StoreContext) -> Result<CheckoutStep, CheckoutError> {
        let step = ctx.checkout.go_back()?;
        add_breadcrumb("checkout", "Went back", Some(&[("step", step.as_str())]));
        Ok(step)
    }

    /// Request a payment session and build the widget options.
    ///
    /// A payment that already succeeded but is not yet confirmed is never
    /// charged again.
    async fn open_payment(&self, ctx: &mut StoreContext) -> Result<WidgetOptions, CheckoutError> {
        if let Some(unconfirmed) = ctx.checkout.unconfirmed_payment() {
            return Err(CheckoutError::FinalizationFailed {
                order_id: unconfirmed.order_id.clone(),
                reason: "payment is awaiting confirmation".to_string(),
            });
        }
        let order_id = ctx.checkout.order_for_payment()?.clone();
        PaymentInitiator::new(self.backend, self.payment)
            .initiate(ctx, &order_id)
            .await
    }

    /// Settle what the widget reported.
    ///
    /// A completion is forwarded verbatim to the order. Only when the
    /// backend confirms it are the cart and checkout cleared.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::UnknownPaymentSession`] (or a step error) for a
    ///   stale or repeated completion; the order is not touched.
    /// - [`CheckoutError::FinalizationFailed`] when the payment succeeded
    ///   but the backend rejected the confirmation. The cart and the proof
    ///   are kept.
    #[instrument(skip(self, ctx, outcome))]
    pub async fn settle_payment(
        &self,
        ctx: &mut StoreContext,
        outcome: WidgetOutcome,
    ) -> Result<Settlement, CheckoutError> {
        let proof = match outcome {
            WidgetOutcome::Dismissed => {
                ctx.checkout.payment_dismissed();
                add_breadcrumb("checkout", "Payment widget dismissed", None);
                return Ok(Settlement::Dismissed);
            }
            WidgetOutcome::Completed(proof) => proof,
        };

        let order_id = ctx.checkout.accept_payment(&proof)?;
        match OrderCoordinator::new(self.backend)
            .patch(ctx, order_id.clone(), OrderChange::Payment(proof.clone()))
            .await
        {
            Ok(_) => Ok(Self::finish(ctx, order_id)),
            Err(err) => {
                tracing::error!(order_id = %order_id, error = %err, "Paid order could not be confirmed");
                ctx.checkout.finalization_failed(order_id.clone(), proof);
                Err(CheckoutError::FinalizationFailed {
                    order_id,
                    reason: err.to_string(),
                })
            }
        }
    }

    /// Re-send the confirmation of a payment the backend did not acknowledge.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::NoActiveOrder`] when nothing is awaiting
    /// confirmation, [`CheckoutError::FinalizationFailed`] if it fails again.
    #[instrument(skip(self, ctx))]
    pub async fn confirm_again(&self, ctx: &mut StoreContext) -> Result<Settlement, CheckoutError> {
        let unconfirmed = ctx
            .checkout
            .unconfirmed_payment()
            .cloned()
            .ok_or(CheckoutError::NoActiveOrder)?;
        let order_id = unconfirmed.order_id.clone();

        match OrderCoordinator::new(self.backend)
            .patch(ctx, order_id.clone(), OrderChange::Payment(unconfirmed.proof))
            .await
        {
            Ok(_) => Ok(Self::finish(ctx, order_id)),
            Err(err) => Err(CheckoutError::FinalizationFailed {
                order_id,
                reason: err.to_string(),
            }),
        }
    }

    /// Run the whole payment step against an in-process widget.
    ///
    /// # Errors
    ///
    /// As [`Self::proceed`] at the payment step and [`Self::settle_payment`].
    pub async fn pay(
        &self,
        ctx: &mut StoreContext,
        widget: &dyn PaymentWidget,
    ) -> Result<Settlement, CheckoutError> {
        let options = self.open_payment(ctx).await?;
        let outcome = widget.open(options).await;
        self.settle_payment(ctx, outcome).await
    }

    fn finish(ctx: &mut StoreContext, order_id: OrderId) -> Settlement {
        ctx.cart.clear();
        ctx.checkout.reset();
        tracing::info!(order_id = %order_id, "Order paid");
        add_breadcrumb("checkout", "Order paid", Some(&[("order_id", order_id.as_str())]));
        Settlement::Paid(order_id)
    }
}
