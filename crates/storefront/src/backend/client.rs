//! HTTP implementation of [`Backend`] using `reqwest`.
//!
//! Listing reads are cached with `moka`; creating or deleting a listing
//! invalidates the whole catalog cache.

use std::sync::Arc;

use async_trait::async_trait;
use kitabwale_core::models::{Address, Cart, Order, PaymentSession, Product, User, Wishlist};
use kitabwale_core::validation::ValidAddress;
use kitabwale_core::{Email, OrderId, ProductId, UserId};
use moka::future::Cache;
use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::{DeserializeOwned, IgnoredAny};
use tracing::{debug, instrument, warn};

use super::cache::{CacheKey, CacheValue};
use super::types::{
    AddToCartRequest, AddressesData, EmailRequest, Envelope, LoginRequest, MessageEnvelope,
    NewListing, NewOrder, OrderPatch, PaymentSessionData, PaymentSessionRequest, ProfileUpdate,
    RegisterRequest, ResetPasswordRequest, SaveAddressRequest, WishlistRequest,
};
use super::{Authenticated, Backend, BackendError, Credential};
use crate::config::ApiConfig;

/// How much of an unexpected body to log.
const LOG_BODY_CHARS: usize = 500;

/// Client for the KitabWale backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("kitabwale-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.to_string(),
                cache,
            }),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.inner.base_url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.inner.client.get(self.url(path))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.inner.client.post(self.url(path))
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.inner.client.put(self.url(path))
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.inner.client.patch(self.url(path))
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.inner.client.delete(self.url(path))
    }

    /// Execute a request and unwrap the envelope, keeping response headers.
    async fn execute_with_headers<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(Envelope<T>, HeaderMap), BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let headers = response.headers().clone();
        let body = response.text().await?;

        // Message-only parse first: a failed call's `data` rarely has the
        // success shape.
        let summary: Option<MessageEnvelope> = serde_json::from_str(&body).ok();
        let message = summary
            .as_ref()
            .and_then(|s| s.message.clone())
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
                StatusCode::NOT_FOUND => BackendError::NotFound(message),
                _ => BackendError::Rejected {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        if !summary.as_ref().is_some_and(|s| s.success) {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = %body.chars().take(LOG_BODY_CHARS).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })?;

        Ok((envelope, headers))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, BackendError> {
        self.execute_with_headers(request).await.map(|(envelope, _)| envelope)
    }

    /// Execute and return `data`, which must be present.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        self.execute(request)
            .await?
            .data
            .ok_or_else(|| BackendError::MissingData(what.to_string()))
    }

    /// Execute and return the backend's message.
    async fn message(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let envelope: MessageEnvelope = self.execute(request).await?;
        Ok(envelope.message.unwrap_or_default())
    }

    fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

/// Attach the captured backend cookie.
fn authed(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
    request.header(COOKIE, credential.cookie_header())
}

/// Percent-encode an id for use as a path segment.
fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Collect `name=value` pairs from `Set-Cookie` headers.
///
/// Cookies being cleared (empty value) are skipped.
fn credential_from(headers: &HeaderMap) -> Option<Credential> {
    let pairs: Vec<&str> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| pair.split_once('=').is_some_and(|(name, value)| !name.is_empty() && !value.is_empty()))
        .collect();
    (!pairs.is_empty()).then(|| Credential::new(pairs.join("; ")))
}

#[async_trait]
impl Backend for ApiClient {
    // =========================================================================
    // Account Methods
    // =========================================================================

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn register(&self, request: &RegisterRequest) -> Result<String, BackendError> {
        self.message(self.post("auth/register").json(request)).await
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn login(&self, email: &Email, password: &str) -> Result<Authenticated, BackendError> {
        let request = self.post("auth/login").json(&LoginRequest {
            email: email.as_str(),
            password,
        });
        let (envelope, headers) = self.execute_with_headers::<User>(request).await?;
        let user = envelope
            .data
            .ok_or_else(|| BackendError::MissingData("user".to_string()))?;
        let credential = credential_from(&headers).ok_or_else(|| {
            BackendError::Unauthorized("login response carried no session cookie".to_string())
        })?;
        Ok(Authenticated { user, credential })
    }

    #[instrument(skip(self, token))]
    async fn verify_email(&self, token: &str) -> Result<Option<Credential>, BackendError> {
        let request = self.get(&format!("auth/verify-email/{}", segment(token)));
        let (_, headers) = self.execute_with_headers::<IgnoredAny>(request).await?;
        Ok(credential_from(&headers))
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn forgot_password(&self, email: &Email) -> Result<String, BackendError> {
        self.message(self.post("auth/forgot-password").json(&EmailRequest {
            email: email.as_str(),
        }))
        .await
    }

    #[instrument(skip(self, token, new_password))]
    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<String, BackendError> {
        let path = format!("auth/reset-password/{}", segment(token));
        self.message(self.post(&path).json(&ResetPasswordRequest { new_password }))
            .await
    }

    #[instrument(skip(self, credential))]
    async fn verify_auth(&self, credential: &Credential) -> Result<User, BackendError> {
        self.fetch(authed(self.get("auth/verify-auth"), credential), "user")
            .await
    }

    #[instrument(skip(self, credential))]
    async fn logout(&self, credential: &Credential) -> Result<(), BackendError> {
        self.message(authed(self.get("auth/logout"), credential))
            .await
            .map(|_| ())
    }

    #[instrument(skip(self, credential, update), fields(user_id = %user_id))]
    async fn update_profile(
        &self,
        credential: &Credential,
        user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<User, BackendError> {
        let path = format!("user/profile/update/{}", segment(user_id.as_str()));
        self.fetch(authed(self.put(&path), credential).json(update), "user")
            .await
    }

    // =========================================================================
    // Listing Methods
    // =========================================================================

    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        if let Some(CacheValue::Products(products)) =
            self.inner.cache.get(&CacheKey::AllProducts).await
        {
            debug!("Cache hit for products");
            return Ok(products);
        }

        let products: Vec<Product> = self.fetch(self.get("product"), "products").await?;
        self.inner
            .cache
            .insert(CacheKey::AllProducts, CacheValue::Products(products.clone()))
            .await;
        Ok(products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("product/{}", segment(id.as_str()));
        let product: Product = self.fetch(self.get(&path), "product").await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self, credential), fields(seller_id = %seller_id))]
    async fn seller_products(
        &self,
        credential: &Credential,
        seller_id: &UserId,
    ) -> Result<Vec<Product>, BackendError> {
        let path = format!("product/seller/{}", segment(seller_id.as_str()));
        self.fetch(authed(self.get(&path), credential), "products")
            .await
    }

    #[instrument(skip(self, credential, listing), fields(title = %listing.listing.title, images = listing.images.len()))]
    async fn create_product(
        &self,
        credential: &Credential,
        listing: NewListing,
    ) -> Result<Product, BackendError> {
        let mut form = Form::new();
        for (name, value) in listing.text_fields()? {
            form = form.text(name, value);
        }
        for image in listing.images {
            let part = Part::bytes(image.bytes)
                .file_name(image.file_name)
                .mime_str(&image.content_type)?;
            form = form.part("images", part);
        }

        let product = self
            .fetch(authed(self.post("product"), credential).multipart(form), "product")
            .await?;
        self.invalidate_catalog();
        Ok(product)
    }

    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    async fn delete_product(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let path = format!("product/seller/{}", segment(product_id.as_str()));
        self.message(authed(self.delete(&path), credential)).await?;
        self.invalidate_catalog();
        Ok(())
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    #[instrument(skip(self, credential), fields(user_id = %user_id))]
    async fn cart(&self, credential: &Credential, user_id: &UserId) -> Result<Cart, BackendError> {
        let path = format!("cart/{}", segment(user_id.as_str()));
        // A user who never added anything has no cart document yet.
        let envelope: Envelope<Cart> = self.execute(authed(self.get(&path), credential)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        let body = AddToCartRequest {
            product_id,
            quantity,
        };
        self.fetch(authed(self.post("cart/add"), credential).json(&body), "cart")
            .await
    }

    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    async fn remove_from_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Cart, BackendError> {
        let path = format!("cart/remove/{}", segment(product_id.as_str()));
        self.fetch(authed(self.delete(&path), credential), "cart")
            .await
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    #[instrument(skip(self, credential), fields(user_id = %user_id))]
    async fn wishlist(
        &self,
        credential: &Credential,
        user_id: &UserId,
    ) -> Result<Wishlist, BackendError> {
        let path = format!("wishlist/{}", segment(user_id.as_str()));
        let envelope: Envelope<Wishlist> =
            self.execute(authed(self.get(&path), credential)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    async fn add_to_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError> {
        let body = WishlistRequest { product_id };
        self.fetch(
            authed(self.post("wishlist/add"), credential).json(&body),
            "wishlist",
        )
        .await
    }

    #[instrument(skip(self, credential), fields(product_id = %product_id))]
    async fn remove_from_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError> {
        let path = format!("wishlist/remove/{}", segment(product_id.as_str()));
        self.fetch(authed(self.delete(&path), credential), "wishlist")
            .await
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    #[instrument(skip(self, credential))]
    async fn orders(&self, credential: &Credential) -> Result<Vec<Order>, BackendError> {
        let envelope: Envelope<Vec<Order>> =
            self.execute(authed(self.get("order"), credential)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    #[instrument(skip(self, credential), fields(order_id = %id))]
    async fn order(&self, credential: &Credential, id: &OrderId) -> Result<Order, BackendError> {
        let path = format!("order/{}", segment(id.as_str()));
        self.fetch(authed(self.get(&path), credential), "order")
            .await
    }

    #[instrument(skip(self, credential, order), fields(items = order.items.len(), total = %order.total_amount))]
    async fn create_order(
        &self,
        credential: &Credential,
        order: &NewOrder,
    ) -> Result<Order, BackendError> {
        self.fetch(authed(self.post("order"), credential).json(order), "order")
            .await
    }

    #[instrument(skip(self, credential, patch), fields(order_id = %patch.order_id))]
    async fn patch_order(
        &self,
        credential: &Credential,
        patch: &OrderPatch,
    ) -> Result<Order, BackendError> {
        self.fetch(authed(self.patch("order"), credential).json(patch), "order")
            .await
    }

    #[instrument(skip(self, credential), fields(order_id = %order_id))]
    async fn create_payment_session(
        &self,
        credential: &Credential,
        order_id: &OrderId,
    ) -> Result<PaymentSession, BackendError> {
        let body = PaymentSessionRequest { order_id };
        let data: PaymentSessionData = self
            .fetch(
                authed(self.post("order/payment-razorpay"), credential).json(&body),
                "payment session",
            )
            .await?;
        Ok(data.order)
    }

    // =========================================================================
    // Address Methods
    // =========================================================================

    #[instrument(skip(self, credential))]
    async fn addresses(&self, credential: &Credential) -> Result<Vec<Address>, BackendError> {
        let envelope: Envelope<AddressesData> = self
            .execute(authed(self.get("user/address"), credential))
            .await?;
        Ok(envelope.data.map(|d| d.addresses).unwrap_or_default())
    }

    #[instrument(skip(self, credential, address), fields(editing = address.address_id.is_some()))]
    async fn save_address(
        &self,
        credential: &Credential,
        address: &ValidAddress,
    ) -> Result<Address, BackendError> {
        let body = SaveAddressRequest::from(address);
        self.fetch(
            authed(self.post("user/address/create-or-update"), credential).json(&body),
            "address",
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn test_credential_from_set_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("access_token=abc123; Path=/; HttpOnly; SameSite=None"),
        );
        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        let credential = credential_from(&headers).unwrap();
        assert_eq!(credential.cookie_header(), "access_token=abc123; theme=dark");
    }

    #[test]
    fn test_credential_skips_cleared_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(
            SET_COOKIE,
            HeaderValue::from_static("access_token=; Expires=Thu, 01 Jan 1970 00:00:00 GMT"),
        );
        assert!(credential_from(&headers).is_none());
    }

    #[test]
    fn test_segment_encodes_ids() {
        assert_eq!(segment("abc/def"), "abc%2Fdef");
        assert_eq!(segment("64f1c0"), "64f1c0");
    }
}
