//! Checkout route handlers.
//!
//! One page per step (`/checkout/cart`, `/checkout/address`,
//! `/checkout/payment`) plus POST actions that call the checkout services,
//! save the visitor's context and redirect with a notice. The payment step
//! renders the hosted widget in the browser; its completion handler posts
//! the correlation fields back to `/checkout/payment/callback`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use kitabwale_core::checkout::{CheckoutError, CheckoutStep};
use kitabwale_core::models::{Address, CartItem, Order, PaymentProof};
use kitabwale_core::pricing::PriceSummary;
use kitabwale_core::validation::AddressInput;
use kitabwale_core::{AddressId, OrderId, PaymentId, PaymentSessionId, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, login_required, redirect_error, redirect_success, save_then};
use crate::error::{AppError, add_breadcrumb};
use crate::filters;
use crate::middleware::auth::safe_redirect_target;
use crate::middleware::{CspNonce, Shopper, SignedInShopper};
use crate::notice::{MessageQuery, backend_code, checkout_code};
use crate::services::{
    AddressResolver, CartService, CheckoutService, ProceedOutcome, Settlement, WidgetOptions,
    WidgetOutcome,
};
use crate::state::AppState;
use crate::views::{StepView, checkout_steps};

/// Page for a checkout step.
fn step_path(step: CheckoutStep) -> String {
    format!("/checkout/{step}")
}

/// Redirect for a rejected step, back to wherever the flow now is.
fn checkout_error_redirect(step: CheckoutStep, err: &CheckoutError) -> Response {
    tracing::warn!(error = %err, step = %step, "Checkout step rejected");
    redirect_error(&step_path(step), checkout_code(err))
}

// =============================================================================
// Form Types
// =============================================================================

/// Add/remove cart form data.
#[derive(Debug, Deserialize)]
pub struct CartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    pub return_to: Option<String>,
}

/// Saved-address selection.
#[derive(Debug, Deserialize)]
pub struct SelectAddressForm {
    pub address_id: String,
}

/// New address form data.
#[derive(Debug, Default, Deserialize)]
pub struct AddressForm {
    pub address_id: Option<String>,
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone_number: String,
}

impl From<AddressForm> for AddressInput {
    fn from(form: AddressForm) -> Self {
        Self {
            address_id: form
                .address_id
                .filter(|id| !id.trim().is_empty())
                .map(AddressId::new),
            line1: form.line1,
            line2: form.line2,
            city: form.city,
            state: form.state,
            pincode: form.pincode,
            phone_number: form.phone_number,
        }
    }
}

/// Fields the payment widget hands to its completion handler.
#[derive(Debug, Deserialize)]
pub struct PaymentCallbackForm {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

impl From<PaymentCallbackForm> for PaymentProof {
    fn from(form: PaymentCallbackForm) -> Self {
        Self {
            razorpay_order_id: PaymentSessionId::new(form.razorpay_order_id),
            razorpay_payment_id: PaymentId::new(form.razorpay_payment_id),
            razorpay_signature: form.razorpay_signature,
        }
    }
}

/// Confirmation page query.
#[derive(Debug, Deserialize)]
pub struct SuccessQuery {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Step 1: cart.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/cart.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub items: Vec<CartItem>,
    pub summary: PriceSummary,
    /// Proceeding from here creates the order.
    pub at_cart_step: bool,
    pub resume_url: String,
}

/// Step 2: shipping address.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/address.html")]
pub struct AddressTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub addresses: Vec<Address>,
    pub selected: Option<AddressId>,
    pub summary: PriceSummary,
}

impl AddressTemplate {
    #[must_use]
    pub fn is_selected(&self, address: &Address) -> bool {
        self.selected.as_ref() == Some(&address.id)
    }
}

/// Step 3: payment.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub summary: PriceSummary,
    pub order_id: String,
    /// A paid order whose confirmation has to be re-sent.
    pub awaiting_confirmation: bool,
}

/// Opens the hosted payment widget.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/widget.html")]
pub struct WidgetTemplate {
    pub layout: Layout,
    pub steps: Vec<StepView>,
    pub summary: PriceSummary,
    /// Widget options, safe to embed in a JSON script block.
    pub options_json: String,
}

/// Order confirmation.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/success.html")]
pub struct SuccessTemplate {
    pub layout: Layout,
    pub order_id: String,
    pub order: Option<Order>,
}

// =============================================================================
// Step Pages
// =============================================================================

/// Redirect to the page for the current step.
pub async fn current_step(SignedInShopper(shopper): SignedInShopper) -> Redirect {
    Redirect::to(&step_path(shopper.ctx.checkout.step()))
}

/// Display the cart, refreshed from the backend.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn cart_page(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Response {
    if let Err(e) = shopper.ctx.refresh_cart(state.backend()).await {
        tracing::warn!(error = %e, "Failed to refresh cart");
        if matches!(e, crate::backend::BackendError::Unauthorized(_)) {
            return AppError::from(e).into_response();
        }
    }

    let step = shopper.ctx.checkout.step();
    let page = CartTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        steps: checkout_steps(CheckoutStep::Cart),
        items: shopper.ctx.cart.items().to_vec(),
        summary: shopper.ctx.cart.summary(),
        at_cart_step: step == CheckoutStep::Cart,
        resume_url: step_path(step),
    };
    save_then(&shopper, page.into_response()).await
}

/// Display the address step.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn address_page(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Response {
    let step = shopper.ctx.checkout.step();
    if step != CheckoutStep::Address {
        return Redirect::to(&step_path(step)).into_response();
    }

    let addresses = match AddressResolver::new(state.backend())
        .list(&shopper.ctx)
        .await
    {
        Ok(addresses) => addresses,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch addresses");
            Vec::new()
        }
    };

    AddressTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        steps: checkout_steps(step),
        selected: shopper.ctx.checkout.shipping_address().cloned(),
        summary: shopper.ctx.cart.summary(),
        addresses,
    }
    .into_response()
}

/// Display the payment step.
pub async fn payment_page(
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Response {
    let checkout = &shopper.ctx.checkout;
    let step = checkout.step();
    if step != CheckoutStep::Payment {
        return Redirect::to(&step_path(step)).into_response();
    }

    PaymentTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        steps: checkout_steps(step),
        summary: shopper.ctx.cart.summary(),
        order_id: checkout.order_id().map(ToString::to_string).unwrap_or_default(),
        awaiting_confirmation: checkout.unconfirmed_payment().is_some(),
    }
    .into_response()
}

// =============================================================================
// Cart Actions
// =============================================================================

/// Add a book to the cart.
#[instrument(skip(state, shopper, form))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    mut shopper: Shopper,
    Form(form): Form<CartForm>,
) -> Response {
    if let Some(redirect) = login_required(&shopper, form.return_to.as_deref()) {
        return redirect;
    }
    let product_id = ProductId::new(form.product_id);
    let quantity = form.quantity.unwrap_or(1);

    let response = match CartService::new(state.backend())
        .add(&mut shopper.ctx, &product_id, quantity)
        .await
    {
        Ok(()) => redirect_success("/checkout/cart", "cart_added"),
        Err(e) => {
            tracing::warn!(error = %e, "Add to cart failed");
            let return_to = safe_redirect_target(form.return_to.as_deref());
            redirect_error(return_to, backend_code(&e, "cart_failed"))
        }
    };
    save_then(&shopper, response).await
}

/// Remove a book from the cart.
#[instrument(skip(state, shopper, form))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<CartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);
    let response = match CartService::new(state.backend())
        .remove(&mut shopper.ctx, &product_id)
        .await
    {
        Ok(()) => redirect_success("/checkout/cart", "cart_removed"),
        Err(e) => {
            tracing::warn!(error = %e, "Remove from cart failed");
            redirect_error("/checkout/cart", backend_code(&e, "cart_failed"))
        }
    };
    save_then(&shopper, response).await
}

// =============================================================================
// Step Transitions
// =============================================================================

/// Advance from the current step.
///
/// At the payment step this renders the widget page instead of redirecting.
#[instrument(skip(state, shopper, nonce))]
pub async fn proceed(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    nonce: CspNonce,
) -> Response {
    let service = CheckoutService::new(state.backend(), &state.config().payment);

    let response = match service.proceed(&mut shopper.ctx).await {
        Ok(ProceedOutcome::MovedTo(CheckoutStep::Address)) => {
            redirect_success(&step_path(CheckoutStep::Address), "order_created")
        }
        Ok(ProceedOutcome::MovedTo(step)) => Redirect::to(&step_path(step)).into_response(),
        Ok(ProceedOutcome::OpenWidget(options)) => {
            widget_page(&shopper, &options, nonce).unwrap_or_else(IntoResponse::into_response)
        }
        Err(e) => checkout_error_redirect(shopper.ctx.checkout.step(), &e),
    };
    save_then(&shopper, response).await
}

fn widget_page(
    shopper: &Shopper,
    options: &WidgetOptions,
    nonce: CspNonce,
) -> Result<Response, AppError> {
    let options_json = options
        .to_script_json()
        .map_err(|e| AppError::Internal(format!("widget options: {e}")))?;
    Ok(WidgetTemplate {
        layout: Layout::new(&shopper.ctx, &MessageQuery::default(), nonce),
        steps: checkout_steps(CheckoutStep::Payment),
        summary: shopper.ctx.cart.summary(),
        options_json,
    }
    .into_response())
}

/// Explicit "Go Back".
pub async fn go_back(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
) -> Response {
    let service = CheckoutService::new(state.backend(), &state.config().payment);
    let response = match service.go_back(&mut shopper.ctx) {
        Ok(step) => Redirect::to(&step_path(step)).into_response(),
        Err(e) => checkout_error_redirect(shopper.ctx.checkout.step(), &e),
    };
    save_then(&shopper, response).await
}

/// Ship to a saved address.
#[instrument(skip(state, shopper, form))]
pub async fn select_address(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<SelectAddressForm>,
) -> Response {
    let address_id = AddressId::new(form.address_id);
    let response = match AddressResolver::new(state.backend())
        .select_saved(&mut shopper.ctx, &address_id)
        .await
    {
        Ok(_) => redirect_success("/checkout/address", "address_selected"),
        Err(e) => checkout_error_redirect(shopper.ctx.checkout.step(), &e),
    };
    save_then(&shopper, response).await
}

/// Save a new address and ship there.
#[instrument(skip(state, shopper, form))]
pub async fn new_address(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<AddressForm>,
) -> Response {
    let address = match AddressInput::from(form).validate() {
        Ok(address) => address,
        Err(e) => {
            tracing::debug!(error = %e, "Address rejected");
            return redirect_error("/checkout/address", "address_invalid");
        }
    };

    let response = match AddressResolver::new(state.backend())
        .save_and_select(&mut shopper.ctx, &address)
        .await
    {
        Ok(_) => redirect_success("/checkout/address", "address_saved"),
        Err(e) => checkout_error_redirect(shopper.ctx.checkout.step(), &e),
    };
    save_then(&shopper, response).await
}

// =============================================================================
// Payment
// =============================================================================

/// Widget completion: forward the proof to the order.
#[instrument(skip(state, shopper, form))]
pub async fn payment_callback(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<PaymentCallbackForm>,
) -> Response {
    let service = CheckoutService::new(state.backend(), &state.config().payment);
    let outcome = WidgetOutcome::Completed(PaymentProof::from(form));
    let response = settlement_response(
        service.settle_payment(&mut shopper.ctx, outcome).await,
        shopper.ctx.checkout.step(),
    );
    save_then(&shopper, response).await
}

/// Widget closed without paying.
pub async fn payment_dismissed(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
) -> Response {
    let service = CheckoutService::new(state.backend(), &state.config().payment);
    let response = settlement_response(
        service
            .settle_payment(&mut shopper.ctx, WidgetOutcome::Dismissed)
            .await,
        shopper.ctx.checkout.step(),
    );
    save_then(&shopper, response).await
}

/// Re-send the confirmation of a paid order.
#[instrument(skip(state, shopper))]
pub async fn confirm_payment(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
) -> Response {
    let service = CheckoutService::new(state.backend(), &state.config().payment);
    let response = settlement_response(
        service.confirm_again(&mut shopper.ctx).await,
        shopper.ctx.checkout.step(),
    );
    save_then(&shopper, response).await
}

fn settlement_response(result: Result<Settlement, CheckoutError>, step: CheckoutStep) -> Response {
    match result {
        Ok(Settlement::Paid(order_id)) => Redirect::to(&format!(
            "/checkout/payment-success?orderId={}",
            urlencoding::encode(order_id.as_str())
        ))
        .into_response(),
        Ok(Settlement::Dismissed) => redirect_error("/checkout/payment", "payment_cancelled"),
        Err(e @ CheckoutError::FinalizationFailed { .. }) => {
            add_breadcrumb("checkout", "Payment confirmation failed", None);
            sentry::capture_error(&e);
            redirect_error("/checkout/payment", checkout_code(&e))
        }
        Err(e) => checkout_error_redirect(step, &e),
    }
}

/// Order confirmation page.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn payment_success(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<SuccessQuery>,
    nonce: CspNonce,
) -> Response {
    let Some(order_id) = query.order_id.filter(|id| !id.is_empty()) else {
        return Redirect::to("/account/orders").into_response();
    };

    let order = match shopper.ctx.credential() {
        Ok(credential) => state
            .backend()
            .order(&credential, &OrderId::new(order_id.clone()))
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Failed to fetch confirmed order"))
            .ok(),
        Err(_) => None,
    };

    SuccessTemplate {
        layout: Layout::new(&shopper.ctx, &MessageQuery::default(), nonce),
        order_id,
        order,
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header::LOCATION};

    fn location(response: &Response) -> Option<&str> {
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_paid_settlement_routes_to_confirmation() {
        let response =
            settlement_response(Ok(Settlement::Paid(OrderId::new("o1"))), CheckoutStep::Cart);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/checkout/payment-success?orderId=o1"));
    }

    #[test]
    fn test_stale_callback_returns_to_current_step() {
        let response = settlement_response(
            Err(CheckoutError::UnknownPaymentSession),
            CheckoutStep::Payment,
        );
        assert_eq!(location(&response), Some("/checkout/payment?error=payment_stale"));
    }

    #[test]
    fn test_dismissal_is_a_notice() {
        let response = settlement_response(Ok(Settlement::Dismissed), CheckoutStep::Payment);
        assert_eq!(
            location(&response),
            Some("/checkout/payment?error=payment_cancelled")
        );
    }

    #[test]
    fn test_callback_form_becomes_proof() {
        let proof = PaymentProof::from(PaymentCallbackForm {
            razorpay_order_id: "order_rzp_1".to_string(),
            razorpay_payment_id: "pay_1".to_string(),
            razorpay_signature: "sig".to_string(),
        });
        assert_eq!(proof.razorpay_order_id.as_str(), "order_rzp_1");
        assert_eq!(proof.razorpay_signature, "sig");
    }
}
