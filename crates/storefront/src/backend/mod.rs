//! KitabWale backend REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth for users, listings, carts,
//!   wishlists, orders and addresses. Nothing is persisted here.
//! - Every response is wrapped in a `{ success, message, data }` envelope.
//! - Authentication is a credential cookie set by `POST /auth/login`. The
//!   storefront captures it, keeps it in the visitor's session and replays it
//!   on every authenticated call.
//! - The listing catalog is cached in memory via `moka`.
//!
//! Handlers and services talk to the [`Backend`] trait so tests can swap in
//! an in-memory implementation; [`ApiClient`] is the HTTP implementation.

mod cache;
mod client;
pub mod types;

use std::fmt;

use async_trait::async_trait;
use kitabwale_core::models::{Address, Cart, Order, PaymentSession, Product, User, Wishlist};
use kitabwale_core::validation::ValidAddress;
use kitabwale_core::{Email, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::ApiClient;
pub use types::{NewListing, NewOrder, OrderPatch, ListingImage, ProfileUpdate, RegisterRequest};

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Credential missing, expired or rejected (HTTP 401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend answered with `success: false` or another error status.
    #[error("Rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// A successful envelope without the expected `data`.
    #[error("Response missing data: {0}")]
    MissingData(String),
}

impl BackendError {
    /// Message safe to show to the shopper.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Unauthorized(_) => "Please log in again.",
            Self::NotFound(_) => "We couldn't find that.",
            Self::RateLimited(_) => "Too many requests, please wait a moment.",
            Self::Rejected { message, .. } if !message.is_empty() => message,
            _ => "Something went wrong, please try again later.",
        }
    }
}

/// The backend's session cookie, captured at login.
///
/// Holds the `name=value` pairs to send back in a `Cookie` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(cookie: impl Into<String>) -> Self {
        Self(cookie.into())
    }

    /// Value for the outgoing `Cookie` header.
    #[must_use]
    pub fn cookie_header(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// A successful login: who the user is plus the credential to replay.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub credential: Credential,
}

/// Every backend call the storefront makes.
#[async_trait]
pub trait Backend: Send + Sync {
    // Accounts

    /// `POST /auth/register`. Returns the backend's confirmation message.
    async fn register(&self, request: &RegisterRequest) -> Result<String, BackendError>;

    /// `POST /auth/login`.
    async fn login(&self, email: &Email, password: &str) -> Result<Authenticated, BackendError>;

    /// `GET /auth/verify-email/{token}`. Returns a credential when the
    /// backend signs the user in as part of verification.
    async fn verify_email(&self, token: &str) -> Result<Option<Credential>, BackendError>;

    /// `POST /auth/forgot-password`.
    async fn forgot_password(&self, email: &Email) -> Result<String, BackendError>;

    /// `POST /auth/reset-password/{token}`.
    async fn reset_password(&self, token: &str, new_password: &str)
    -> Result<String, BackendError>;

    /// `GET /auth/verify-auth`.
    async fn verify_auth(&self, credential: &Credential) -> Result<User, BackendError>;

    /// `GET /auth/logout`.
    async fn logout(&self, credential: &Credential) -> Result<(), BackendError>;

    /// `PUT /user/profile/update/{userId}`.
    async fn update_profile(
        &self,
        credential: &Credential,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<User, BackendError>;

    // Listings

    /// `GET /product`.
    async fn products(&self) -> Result<Vec<Product>, BackendError>;

    /// `GET /product/{id}`.
    async fn product(&self, id: &ProductId) -> Result<Product, BackendError>;

    /// `GET /product/seller/{sellerId}`.
    async fn seller_products(
        &self,
        credential: &Credential,
        seller_id: &UserId,
    ) -> Result<Vec<Product>, BackendError>;

    /// `POST /product` (multipart).
    async fn create_product(
        &self,
        credential: &Credential,
        listing: NewListing,
    ) -> Result<Product, BackendError>;

    /// `DELETE /product/seller/{productId}`.
    async fn delete_product(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<(), BackendError>;

    // Cart

    /// `GET /cart/{userId}`.
    async fn cart(&self, credential: &Credential, user_id: &UserId) -> Result<Cart, BackendError>;

    /// `POST /cart/add`.
    async fn add_to_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError>;

    /// `DELETE /cart/remove/{productId}`.
    async fn remove_from_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Cart, BackendError>;

    // Wishlist

    /// `GET /wishlist/{userId}`.
    async fn wishlist(
        &self,
        credential: &Credential,
        user_id: &UserId,
    ) -> Result<Wishlist, BackendError>;

    /// `POST /wishlist/add`.
    async fn add_to_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError>;

    /// `DELETE /wishlist/remove/{productId}`.
    async fn remove_from_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError>;

    // Orders

    /// `GET /order`.
    async fn orders(&self, credential: &Credential) -> Result<Vec<Order>, BackendError>;

    /// `GET /order/{id}`.
    async fn order(&self, credential: &Credential, id: &OrderId) -> Result<Order, BackendError>;

    /// `POST /order`.
    async fn create_order(
        &self,
        credential: &Credential,
        order: &NewOrder,
    ) -> Result<Order, BackendError>;

    /// `PATCH /order`.
    async fn patch_order(
        &self,
        credential: &Credential,
        patch: &OrderPatch,
    ) -> Result<Order, BackendError>;

    /// `POST /order/payment-razorpay`.
    async fn create_payment_session(
        &self,
        credential: &Credential,
        order_id: &OrderId,
    ) -> Result<PaymentSession, BackendError>;

    // Addresses

    /// `GET /user/address`.
    async fn addresses(&self, credential: &Credential) -> Result<Vec<Address>, BackendError>;

    /// `POST /user/address/create-or-update`.
    async fn save_address(
        &self,
        credential: &Credential,
        address: &ValidAddress,
    ) -> Result<Address, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_display() {
        let err = BackendError::NotFound("product p1".to_string());
        assert_eq!(err.to_string(), "Not found: product p1");

        let err = BackendError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
    }

    #[test]
    fn test_user_message_prefers_backend_text() {
        let err = BackendError::Rejected {
            status: 400,
            message: "Product already in cart".to_string(),
        };
        assert_eq!(err.user_message(), "Product already in cart");

        let err = BackendError::MissingData("order".to_string());
        assert_eq!(
            err.user_message(),
            "Something went wrong, please try again later."
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new("access_token=abc123");
        assert_eq!(format!("{credential:?}"), "Credential([REDACTED])");
        assert_eq!(credential.cookie_header(), "access_token=abc123");
    }
}
