//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /health, /health/ready         - Health checks
//! GET  /about-us, /privacy-policy, /terms-of-use
//!
//! # Books
//! GET  /books                         - Catalog (filters, search, sort, pages)
//! GET  /books/{id}                    - Book detail
//! GET  /book-sell                     - Post-an-ad form
//! POST /book-sell                     - Create listing (multipart)
//! POST /wishlist/toggle               - Add/remove wishlist entry
//!
//! # Checkout
//! GET  /checkout                      - Redirect to the current step
//! GET  /checkout/cart                 - Step 1: cart
//! POST /checkout/cart/add             - Add to cart
//! POST /checkout/cart/remove          - Remove from cart
//! GET  /checkout/address              - Step 2: shipping address
//! POST /checkout/address              - Select a saved address
//! POST /checkout/address/new          - Save and select a new address
//! GET  /checkout/payment              - Step 3: payment
//! POST /checkout/proceed              - Advance (creates order / opens widget)
//! POST /checkout/back                 - Go back one step
//! POST /checkout/payment/callback     - Widget completion
//! POST /checkout/payment/dismissed    - Widget closed
//! POST /checkout/payment/confirm      - Re-send an unconfirmed payment
//! GET  /checkout/payment-success      - Confirmation (?orderId=)
//!
//! # Auth
//! GET|POST /auth/login, /auth/register, /auth/forgot-password
//! POST /auth/logout
//! GET  /auth/verify-email/{token}
//! GET|POST /auth/reset-password/{token}
//!
//! # Account (requires auth)
//! GET|POST /account                   - Profile
//! GET  /account/orders[/{id}]         - Order history / detail
//! GET  /account/wishlist              - Wishlist
//! POST /account/wishlist/remove
//! GET|POST /account/addresses         - Address book
//! GET  /account/listings              - My listings
//! POST /account/listings/{id}/delete
//! ```

pub mod account;
pub mod auth;
pub mod books;
pub mod checkout;
pub mod home;
pub mod pages;
pub mod sell;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};

use crate::error::AppError;
use crate::middleware::{CspNonce, Shopper, auth_rate_limiter, checkout_rate_limiter};
use crate::models::CurrentUser;
use crate::notice::{MessageQuery, Notice};
use crate::services::StoreContext;
use crate::state::AppState;

// =============================================================================
// Shared page chrome
// =============================================================================

/// Data every page layout needs: header badges, notice, CSP nonce.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub wishlist_count: usize,
    pub notice: Option<Notice>,
    pub nonce: String,
}

impl Layout {
    #[must_use]
    pub fn new(ctx: &StoreContext, query: &MessageQuery, CspNonce(nonce): CspNonce) -> Self {
        Self {
            user: ctx.user().cloned(),
            cart_count: ctx.cart.item_count(),
            wishlist_count: ctx.wishlist.len(),
            notice: query.notice(),
            nonce,
        }
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn user_name(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.first_name())
    }
}

/// Append a notice code to a path.
#[must_use]
pub fn with_notice(path: &str, kind: &str, code: &str) -> String {
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{kind}={code}")
}

/// Redirect carrying an error notice.
#[must_use]
pub fn redirect_error(path: &str, code: &str) -> Response {
    Redirect::to(&with_notice(path, "error", code)).into_response()
}

/// Redirect carrying a success notice.
#[must_use]
pub fn redirect_success(path: &str, code: &str) -> Response {
    Redirect::to(&with_notice(path, "success", code)).into_response()
}

/// Save the shopper's context, then send `response`.
pub async fn save_then(shopper: &Shopper, response: Response) -> Response {
    match shopper.save().await {
        Ok(()) => response,
        Err(e) => AppError::from(e).into_response(),
    }
}

/// Redirect signed-out visitors to the login page, returning to `return_to`.
#[must_use]
pub fn login_required(shopper: &Shopper, return_to: Option<&str>) -> Option<Response> {
    if shopper.ctx.is_authenticated() {
        return None;
    }
    let target = crate::middleware::auth::safe_redirect_target(return_to);
    Some(Redirect::to(&crate::middleware::auth::login_redirect_url(target)).into_response())
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password/{token}", post(auth::reset_password))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/forgot-password", get(auth::forgot_password_page))
        .route("/reset-password/{token}", get(auth::reset_password_page))
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/logout", post(auth::logout))
        .merge(limited)
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/cart/add", post(checkout::add_to_cart))
        .route("/cart/remove", post(checkout::remove_from_cart))
        .route("/proceed", post(checkout::proceed))
        .route("/back", post(checkout::go_back))
        .route("/address", post(checkout::select_address))
        .route("/address/new", post(checkout::new_address))
        .route("/payment/callback", post(checkout::payment_callback))
        .route("/payment/dismissed", post(checkout::payment_dismissed))
        .route("/payment/confirm", post(checkout::confirm_payment))
        .layer(checkout_rate_limiter());

    Router::new()
        .route("/", get(checkout::current_step))
        .route("/cart", get(checkout::cart_page))
        .route("/address", get(checkout::address_page))
        .route("/payment", get(checkout::payment_page))
        .route("/payment-success", get(checkout::payment_success))
        .merge(limited)
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::profile).post(account::update_profile))
        .route("/orders", get(account::orders))
        .route("/orders/{id}", get(account::order_detail))
        .route("/wishlist", get(account::wishlist))
        .route("/wishlist/remove", post(account::remove_from_wishlist))
        .route(
            "/addresses",
            get(account::addresses).post(account::save_address),
        )
        .route("/listings", get(account::listings))
        .route("/listings/{id}/delete", post(account::delete_listing))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/books", get(books::index))
        .route("/books/{id}", get(books::show))
        .route(
            "/book-sell",
            get(sell::form)
                .post(sell::create)
                .layer(DefaultBodyLimit::max(sell::MAX_UPLOAD_BYTES)),
        )
        .route("/wishlist/toggle", post(books::toggle_wishlist))
        .route("/about-us", get(pages::about))
        .route("/privacy-policy", get(pages::privacy))
        .route("/terms-of-use", get(pages::terms))
        .nest("/checkout", checkout_routes())
        .nest("/account", account_routes())
        .nest("/auth", auth_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 when the backend catalog cannot be read.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.backend().products().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_notice() {
        assert_eq!(with_notice("/books", "error", "not_found"), "/books?error=not_found");
        assert_eq!(
            with_notice("/books?page=2", "success", "cart_added"),
            "/books?page=2&success=cart_added"
        );
    }
}
