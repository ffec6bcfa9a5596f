//! Checkout state machine.
//!
//! `cart → address → payment → (success)`. Transitions here are pure: the
//! storefront performs the backend call for a step first and only then
//! records the outcome on [`CheckoutState`], so a rejected call leaves the
//! shopper on the step they were on.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PaymentProof;
use crate::types::{AddressId, OrderId, PaymentSessionId};

/// Steps in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    /// Cart review.
    #[default]
    Cart,
    /// Shipping address selection.
    Address,
    /// Hosted payment widget.
    Payment,
}

impl CheckoutStep {
    pub const ALL: [Self; 3] = [Self::Cart, Self::Address, Self::Payment];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Address => "address",
            Self::Payment => "payment",
        }
    }

    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Cart => "Cart",
            Self::Address => "Address",
            Self::Payment => "Payment",
        }
    }

    /// Step number (1-indexed) for the progress bar.
    #[must_use]
    pub const fn number(&self) -> u8 {
        match self {
            Self::Cart => 1,
            Self::Address => 2,
            Self::Payment => 3,
        }
    }
}

impl fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a checkout step could not be taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("could not create your order: {0}")]
    OrderCreation(String),

    #[error("please select a shipping address to continue")]
    MissingAddress,

    #[error("could not update your order: {0}")]
    OrderUpdate(String),

    #[error("could not start the payment: {0}")]
    PaymentInit(String),

    #[error("your cart is empty")]
    EmptyCart,

    #[error("there is no order in progress")]
    NoActiveOrder,

    #[error("checkout is at the {actual} step, not {expected}")]
    NotAtStep {
        expected: CheckoutStep,
        actual: CheckoutStep,
    },

    #[error("payment confirmation does not match the pending payment")]
    UnknownPaymentSession,

    #[error("payment for order {order_id} succeeded but the order could not be confirmed: {reason}")]
    FinalizationFailed { order_id: OrderId, reason: String },
}

/// A payment the widget reported as successful but the backend did not
/// acknowledge. Kept so confirmation can be re-sent without paying again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmedPayment {
    pub order_id: OrderId,
    pub proof: PaymentProof,
}

/// Per-session checkout progress.
///
/// Invariants:
/// - `step` is `Payment` only while a shipping address is selected.
/// - `step` is `Cart` only without an order; going back to the cart
///   discards the in-progress order reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckoutState {
    order_id: Option<OrderId>,
    step: CheckoutStep,
    shipping_address: Option<AddressId>,
    pending_payment: Option<PaymentSessionId>,
    unconfirmed_payment: Option<UnconfirmedPayment>,
}

impl CheckoutState {
    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn order_id(&self) -> Option<&OrderId> {
        self.order_id.as_ref()
    }

    #[must_use]
    pub const fn shipping_address(&self) -> Option<&AddressId> {
        self.shipping_address.as_ref()
    }

    #[must_use]
    pub const fn pending_payment(&self) -> Option<&PaymentSessionId> {
        self.pending_payment.as_ref()
    }

    #[must_use]
    pub const fn unconfirmed_payment(&self) -> Option<&UnconfirmedPayment> {
        self.unconfirmed_payment.as_ref()
    }

    /// Error unless the flow is at `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NotAtStep`] when at another step.
    pub fn ensure_at(&self, expected: CheckoutStep) -> Result<(), CheckoutError> {
        if self.step == expected {
            Ok(())
        } else {
            Err(CheckoutError::NotAtStep {
                expected,
                actual: self.step,
            })
        }
    }

    /// The in-progress order id.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NoActiveOrder`] before an order exists.
    pub fn active_order(&self) -> Result<&OrderId, CheckoutError> {
        self.order_id.as_ref().ok_or(CheckoutError::NoActiveOrder)
    }

    /// Check that an order may be created from the cart.
    ///
    /// # Errors
    ///
    /// Fails when not at the cart step or the cart is empty.
    pub fn ensure_can_begin(&self, cart_is_empty: bool) -> Result<(), CheckoutError> {
        self.ensure_at(CheckoutStep::Cart)?;
        if cart_is_empty {
            return Err(CheckoutError::EmptyCart);
        }
        Ok(())
    }

    /// Record a successfully created order and move to the address step.
    pub fn order_created(&mut self, order_id: OrderId) {
        self.order_id = Some(order_id);
        self.step = CheckoutStep::Address;
        self.shipping_address = None;
        self.pending_payment = None;
    }

    /// Record that the order was patched with a shipping address.
    ///
    /// # Errors
    ///
    /// Fails when not at the address step.
    pub fn address_selected(&mut self, address_id: AddressId) -> Result<(), CheckoutError> {
        self.ensure_at(CheckoutStep::Address)?;
        self.shipping_address = Some(address_id);
        Ok(())
    }

    /// Move from address to payment.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingAddress`] without a selected address.
    pub fn proceed_to_payment(&mut self) -> Result<(), CheckoutError> {
        self.ensure_at(CheckoutStep::Address)?;
        self.active_order()?;
        if self.shipping_address.is_none() {
            return Err(CheckoutError::MissingAddress);
        }
        self.step = CheckoutStep::Payment;
        Ok(())
    }

    /// Explicit "Go Back".
    ///
    /// Leaving the address step for the cart discards the order reference.
    ///
    /// # Errors
    ///
    /// Fails at the cart step, which has nothing before it.
    pub fn go_back(&mut self) -> Result<CheckoutStep, CheckoutError> {
        match self.step {
            CheckoutStep::Cart => {
                return Err(CheckoutError::NotAtStep {
                    expected: CheckoutStep::Address,
                    actual: CheckoutStep::Cart,
                });
            }
            CheckoutStep::Address => {
                self.order_id = None;
                self.shipping_address = None;
                self.step = CheckoutStep::Cart;
            }
            CheckoutStep::Payment => {
                self.step = CheckoutStep::Address;
            }
        }
        self.pending_payment = None;
        Ok(self.step)
    }

    /// The order a payment session should be requested for.
    ///
    /// # Errors
    ///
    /// Fails outside the payment step or without an address or order.
    pub fn order_for_payment(&self) -> Result<&OrderId, CheckoutError> {
        self.ensure_at(CheckoutStep::Payment)?;
        if self.shipping_address.is_none() {
            return Err(CheckoutError::MissingAddress);
        }
        self.active_order()
    }

    /// Remember the session the widget was opened with.
    pub fn payment_started(&mut self, session_id: PaymentSessionId) {
        self.pending_payment = Some(session_id);
    }

    /// The widget was closed without paying. Nothing else changes.
    pub fn payment_dismissed(&mut self) {
        self.pending_payment = None;
    }

    /// Match a widget completion against the pending session.
    ///
    /// Stale or repeated callbacks do not match and never reach the order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::UnknownPaymentSession`] on mismatch.
    pub fn accept_payment(&self, proof: &PaymentProof) -> Result<OrderId, CheckoutError> {
        let order_id = self.order_for_payment()?;
        match &self.pending_payment {
            Some(pending) if *pending == proof.razorpay_order_id => Ok(order_id.clone()),
            _ => Err(CheckoutError::UnknownPaymentSession),
        }
    }

    /// The backend rejected the confirmation patch for a paid order.
    pub fn finalization_failed(&mut self, order_id: OrderId, proof: PaymentProof) {
        self.pending_payment = None;
        self.unconfirmed_payment = Some(UnconfirmedPayment { order_id, proof });
    }

    /// The cart changed under an in-progress checkout.
    ///
    /// The order snapshot is stale, so the flow restarts at the cart step.
    /// An unconfirmed payment survives so it can still be re-sent.
    pub fn cart_changed(&mut self) {
        if self.step != CheckoutStep::Cart {
            self.order_id = None;
            self.shipping_address = None;
            self.pending_payment = None;
            self.step = CheckoutStep::Cart;
        }
    }

    /// Terminal: forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PaymentId;

    fn proof(session: &str) -> PaymentProof {
        PaymentProof {
            razorpay_order_id: PaymentSessionId::new(session),
            razorpay_payment_id: PaymentId::new("pay_1"),
            razorpay_signature: "sig".to_string(),
        }
    }

    fn at_payment() -> CheckoutState {
        let mut state = CheckoutState::default();
        state.order_created(OrderId::new("o1"));
        state.address_selected(AddressId::new("a1")).unwrap();
        state.proceed_to_payment().unwrap();
        state
    }

    #[test]
    fn test_begin_requires_items() {
        let state = CheckoutState::default();
        assert_eq!(state.ensure_can_begin(true), Err(CheckoutError::EmptyCart));
        assert!(state.ensure_can_begin(false).is_ok());
    }

    #[test]
    fn test_cannot_reach_payment_without_address() {
        let mut state = CheckoutState::default();
        state.order_created(OrderId::new("o1"));
        assert_eq!(state.proceed_to_payment(), Err(CheckoutError::MissingAddress));
        assert_eq!(state.step(), CheckoutStep::Address);
    }

    #[test]
    fn test_happy_path_steps() {
        let state = at_payment();
        assert_eq!(state.step(), CheckoutStep::Payment);
        assert_eq!(state.order_for_payment().unwrap().as_str(), "o1");
    }

    #[test]
    fn test_go_back_to_cart_discards_order() {
        let mut state = at_payment();
        assert_eq!(state.go_back().unwrap(), CheckoutStep::Address);
        assert_eq!(state.order_id().unwrap().as_str(), "o1");
        assert!(state.shipping_address().is_some());

        assert_eq!(state.go_back().unwrap(), CheckoutStep::Cart);
        assert!(state.order_id().is_none());
        assert!(state.shipping_address().is_none());
        assert!(state.go_back().is_err());
    }

    #[test]
    fn test_accept_payment_matches_pending_session() {
        let mut state = at_payment();
        assert_eq!(
            state.accept_payment(&proof("order_A")),
            Err(CheckoutError::UnknownPaymentSession)
        );

        state.payment_started(PaymentSessionId::new("order_A"));
        assert_eq!(
            state.accept_payment(&proof("order_B")),
            Err(CheckoutError::UnknownPaymentSession)
        );
        assert_eq!(state.accept_payment(&proof("order_A")).unwrap().as_str(), "o1");
    }

    #[test]
    fn test_dismissal_only_clears_pending_session() {
        let mut state = at_payment();
        state.payment_started(PaymentSessionId::new("order_A"));
        state.payment_dismissed();
        assert!(state.pending_payment().is_none());
        assert_eq!(state.step(), CheckoutStep::Payment);
        assert_eq!(state.order_id().unwrap().as_str(), "o1");
    }

    #[test]
    fn test_callback_after_reset_is_rejected() {
        let mut state = at_payment();
        state.payment_started(PaymentSessionId::new("order_A"));
        state.reset();
        assert!(state.accept_payment(&proof("order_A")).is_err());
    }

    #[test]
    fn test_cart_change_restarts_checkout() {
        let mut state = at_payment();
        state.finalization_failed(OrderId::new("o1"), proof("order_A"));
        state.cart_changed();
        assert_eq!(state.step(), CheckoutStep::Cart);
        assert!(state.order_id().is_none());
        assert!(state.unconfirmed_payment().is_some());
    }

    #[test]
    fn test_finalization_failure_keeps_proof() {
        let mut state = at_payment();
        state.payment_started(PaymentSessionId::new("order_A"));
        state.finalization_failed(OrderId::new("o1"), proof("order_A"));
        let unconfirmed = state.unconfirmed_payment().unwrap();
        assert_eq!(unconfirmed.order_id.as_str(), "o1");
        assert!(state.pending_payment().is_none());
        assert_eq!(state.step(), CheckoutStep::Payment);
    }
}
