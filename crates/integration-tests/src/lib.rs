//! Integration test support for the KitabWale storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kitabwale-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - the checkout services against [`FakeBackend`]
//! - `api_client` - the HTTP backend client against a stub REST server
//! - `storefront_http` - the full router served on an ephemeral port
//!
//! Nothing here needs a running KitabWale backend.

#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use kitabwale_core::models::{
    Address, AddressRef, Cart, CartItem, Order, OrderItem, PaymentSession, Product, ProductRef,
    User, Wishlist,
};
use kitabwale_core::pricing::ShippingCharge;
use kitabwale_core::validation::ValidAddress;
use kitabwale_core::{
    AddressId, Email, OrderId, OrderStatus, PaymentSessionId, Price, ProductId, UserId,
};
use kitabwale_storefront::backend::{
    Authenticated, Backend, BackendError, Credential, NewListing, NewOrder, OrderPatch,
    ProfileUpdate, RegisterRequest,
};
use kitabwale_storefront::config::{ApiConfig, PaymentConfig, StorefrontConfig};
use kitabwale_storefront::services::StoreContext;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::SecretString;

/// The one account the fake knows about.
pub const USER_ID: &str = "u1";
pub const USER_EMAIL: &str = "asha@example.com";
pub const USER_PASSWORD: &str = "secret123";
/// Cookie the fake issues at login and expects back.
pub const CREDENTIAL: &str = "access_token=test-token";

/// A listing with the given prices.
#[must_use]
pub fn book(id: &str, price: i64, final_price: i64, shipping: ShippingCharge) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Book {id}"),
        images: vec![format!("https://img.example.com/{id}.jpg")],
        subject: "Physics".to_string(),
        category: "Exam/Test Preparation Books".to_string(),
        condition: "Good".to_string(),
        class_type: "Class 12".to_string(),
        price: Price::rupees(price),
        final_price: Price::rupees(final_price),
        shipping_charge: shipping,
        author: "H. C. Verma".to_string(),
        edition: None,
        description: None,
        seller: None,
        payment_mode: None,
        payment_details: None,
        created_at: None,
    }
}

/// A saved address.
#[must_use]
pub fn address(id: &str) -> Address {
    Address {
        id: AddressId::new(id),
        line1: "12 MG Road".to_string(),
        line2: None,
        city: "Pune".to_string(),
        state: "Maharashtra".to_string(),
        pincode: "411001".to_string(),
        phone_number: "9876543210".to_string(),
    }
}

#[must_use]
pub fn user() -> User {
    User {
        id: UserId::new(USER_ID),
        name: "Asha Patil".to_string(),
        email: USER_EMAIL.to_string(),
        phone_number: None,
        is_verified: true,
    }
}

/// Everything the fake backend stores, open for assertions.
#[derive(Debug, Default)]
pub struct FakeState {
    pub products: Vec<Product>,
    pub cart: Vec<CartItem>,
    pub wishlist: Vec<ProductId>,
    pub orders: Vec<Order>,
    pub addresses: Vec<Address>,
    pub payment_sessions: Vec<(PaymentSessionId, OrderId)>,
    pub created_orders: Vec<NewOrder>,
    pub patches: Vec<OrderPatch>,
    pub wishlist_removals: usize,
    /// Payment patches to reject before accepting one.
    pub reject_payment_patches: usize,
    /// Reject every payment-session request.
    pub reject_payment_sessions: bool,
    /// Reject every order creation.
    pub reject_order_creation: bool,
    /// Reject every shipping-address patch.
    pub reject_address_patches: bool,
    next_id: u32,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}{}", self.next_id)
    }

    fn cart(&self) -> Cart {
        Cart {
            id: None,
            items: self.cart.clone(),
        }
    }

    fn wishlist(&self) -> Wishlist {
        Wishlist {
            id: None,
            products: self
                .wishlist
                .iter()
                .map(|id| {
                    self.products
                        .iter()
                        .find(|p| &p.id == id)
                        .map_or_else(|| ProductRef::Id(id.clone()), |p| ProductRef::Product(Box::new(p.clone())))
                })
                .collect(),
        }
    }

    fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        self.products
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("product {id}")))
    }
}

/// In-memory [`Backend`] with a single user and their collections.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

impl FakeBackend {
    /// A backend listing the given books.
    #[must_use]
    pub fn with_products(products: Vec<Product>) -> Self {
        let backend = Self::default();
        backend.state().products = products;
        backend
    }

    /// Lock the state for setup or assertions.
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn check(credential: &Credential) -> Result<(), BackendError> {
        if credential.cookie_header() == CREDENTIAL {
            Ok(())
        } else {
            Err(BackendError::Unauthorized("invalid token".to_string()))
        }
    }

    /// A signed-in store context with cart and wishlist loaded.
    pub async fn signed_in(&self) -> StoreContext {
        let mut ctx = StoreContext::new();
        ctx.initialize(
            self,
            Authenticated {
                user: user(),
                credential: Credential::new(CREDENTIAL),
            },
        )
        .await
        .unwrap();
        ctx
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn register(&self, request: &RegisterRequest) -> Result<String, BackendError> {
        if request.email == USER_EMAIL {
            return Err(BackendError::Rejected {
                status: 400,
                message: "User already exists".to_string(),
            });
        }
        Ok("Verification email sent".to_string())
    }

    async fn login(&self, email: &Email, password: &str) -> Result<Authenticated, BackendError> {
        if email.as_str() == USER_EMAIL && password == USER_PASSWORD {
            Ok(Authenticated {
                user: user(),
                credential: Credential::new(CREDENTIAL),
            })
        } else {
            Err(BackendError::Unauthorized("Invalid credentials".to_string()))
        }
    }

    async fn verify_email(&self, token: &str) -> Result<Option<Credential>, BackendError> {
        match token {
            "signin" => Ok(Some(Credential::new(CREDENTIAL))),
            "valid" => Ok(None),
            _ => Err(BackendError::Rejected {
                status: 400,
                message: "Invalid token".to_string(),
            }),
        }
    }

    async fn forgot_password(&self, _email: &Email) -> Result<String, BackendError> {
        Ok("Reset email sent".to_string())
    }

    async fn reset_password(&self, token: &str, _new_password: &str) -> Result<String, BackendError> {
        if token == "valid" {
            Ok("Password updated".to_string())
        } else {
            Err(BackendError::Rejected {
                status: 400,
                message: "Invalid token".to_string(),
            })
        }
    }

    async fn verify_auth(&self, credential: &Credential) -> Result<User, BackendError> {
        Self::check(credential)?;
        Ok(user())
    }

    async fn logout(&self, credential: &Credential) -> Result<(), BackendError> {
        Self::check(credential)
    }

    async fn update_profile(
        &self,
        credential: &Credential,
        _user_id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<User, BackendError> {
        Self::check(credential)?;
        Ok(User {
            name: update.name.clone(),
            phone_number: update.phone_number.clone(),
            ..user()
        })
    }

    async fn products(&self) -> Result<Vec<Product>, BackendError> {
        Ok(self.state().products.clone())
    }

    async fn product(&self, id: &ProductId) -> Result<Product, BackendError> {
        self.state().product(id)
    }

    async fn seller_products(
        &self,
        credential: &Credential,
        _seller_id: &UserId,
    ) -> Result<Vec<Product>, BackendError> {
        Self::check(credential)?;
        Ok(self.state().products.clone())
    }

    async fn create_product(
        &self,
        credential: &Credential,
        listing: NewListing,
    ) -> Result<Product, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        let id = state.next_id("p");
        let mut product = book(&id, 0, 0, listing.listing.shipping_charge);
        product.title = listing.listing.title;
        product.price = listing.listing.price;
        product.final_price = listing.listing.final_price;
        state.products.push(product.clone());
        Ok(product)
    }

    async fn delete_product(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        Self::check(credential)?;
        self.state().products.retain(|p| &p.id != product_id);
        Ok(())
    }

    async fn cart(&self, credential: &Credential, _user_id: &UserId) -> Result<Cart, BackendError> {
        Self::check(credential)?;
        Ok(self.state().cart())
    }

    async fn add_to_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        let product = state.product(product_id)?;
        match state.cart.iter_mut().find(|item| &item.product.id == product_id) {
            Some(item) => item.quantity += quantity,
            None => state.cart.push(CartItem {
                id: None,
                product,
                quantity,
            }),
        }
        Ok(state.cart())
    }

    async fn remove_from_cart(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Cart, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        state.cart.retain(|item| &item.product.id != product_id);
        Ok(state.cart())
    }

    async fn wishlist(
        &self,
        credential: &Credential,
        _user_id: &UserId,
    ) -> Result<Wishlist, BackendError> {
        Self::check(credential)?;
        Ok(self.state().wishlist())
    }

    async fn add_to_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        if !state.wishlist.contains(product_id) {
            state.wishlist.push(product_id.clone());
        }
        Ok(state.wishlist())
    }

    async fn remove_from_wishlist(
        &self,
        credential: &Credential,
        product_id: &ProductId,
    ) -> Result<Wishlist, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        state.wishlist_removals += 1;
        state.wishlist.retain(|id| id != product_id);
        Ok(state.wishlist())
    }

    async fn orders(&self, credential: &Credential) -> Result<Vec<Order>, BackendError> {
        Self::check(credential)?;
        Ok(self.state().orders.clone())
    }

    async fn order(&self, credential: &Credential, id: &OrderId) -> Result<Order, BackendError> {
        Self::check(credential)?;
        self.state()
            .orders
            .iter()
            .find(|order| &order.id == id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("order {id}")))
    }

    async fn create_order(
        &self,
        credential: &Credential,
        order: &NewOrder,
    ) -> Result<Order, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        if state.reject_order_creation {
            return Err(BackendError::Rejected {
                status: 400,
                message: "Product is no longer available".to_string(),
            });
        }
        state.created_orders.push(order.clone());
        let id = state.next_id("o");
        let created = Order {
            id: OrderId::new(id),
            user: None,
            items: order.items.clone(),
            total_amount: order.total_amount,
            shipping_address: None,
            payment_details: None,
            status: OrderStatus::Processing,
            payment_status: None,
            created_at: None,
        };
        state.orders.push(created.clone());
        Ok(created)
    }

    async fn patch_order(
        &self,
        credential: &Credential,
        patch: &OrderPatch,
    ) -> Result<Order, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        state.patches.push(patch.clone());

        if patch.shipping_address.is_some() && state.reject_address_patches {
            return Err(BackendError::Rejected {
                status: 400,
                message: "We do not deliver to this pincode".to_string(),
            });
        }

        if patch.payment_details.is_some() && state.reject_payment_patches > 0 {
            state.reject_payment_patches -= 1;
            return Err(BackendError::Rejected {
                status: 500,
                message: "Payment verification failed".to_string(),
            });
        }

        let paid = patch.payment_details.is_some();
        let order = state
            .orders
            .iter_mut()
            .find(|order| order.id == patch.order_id)
            .ok_or_else(|| BackendError::NotFound(format!("order {}", patch.order_id)))?;
        if let Some(address) = &patch.shipping_address {
            order.shipping_address = Some(AddressRef::Address(address.clone()));
        }
        if let Some(proof) = &patch.payment_details {
            order.payment_details = Some(proof.clone());
            order.payment_status = Some("paid".to_string());
        }
        let order = order.clone();
        if paid {
            state.cart.clear();
        }
        Ok(order)
    }

    async fn create_payment_session(
        &self,
        credential: &Credential,
        order_id: &OrderId,
    ) -> Result<PaymentSession, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        if state.reject_payment_sessions {
            return Err(BackendError::Rejected {
                status: 502,
                message: "Payment gateway unavailable".to_string(),
            });
        }
        let total = state
            .orders
            .iter()
            .find(|order| &order.id == order_id)
            .map(|order| order.total_amount)
            .ok_or_else(|| BackendError::NotFound(format!("order {order_id}")))?;
        let id = PaymentSessionId::new(state.next_id("order_rzp_"));
        state.payment_sessions.push((id.clone(), order_id.clone()));
        Ok(PaymentSession {
            id,
            amount: (total.amount() * Decimal::from(100)).to_u64().unwrap_or_default(),
            currency: "INR".to_string(),
        })
    }

    async fn addresses(&self, credential: &Credential) -> Result<Vec<Address>, BackendError> {
        Self::check(credential)?;
        Ok(self.state().addresses.clone())
    }

    async fn save_address(
        &self,
        credential: &Credential,
        input: &ValidAddress,
    ) -> Result<Address, BackendError> {
        Self::check(credential)?;
        let mut state = self.state();
        let id = match &input.address_id {
            Some(id) => id.clone(),
            None => AddressId::new(state.next_id("a")),
        };
        let saved = Address {
            id: id.clone(),
            line1: input.line1.clone(),
            line2: input.line2.clone(),
            city: input.city.clone(),
            state: input.state.clone(),
            pincode: input.pincode.clone(),
            phone_number: input.phone_number.clone(),
        };
        state.addresses.retain(|a| a.id != id);
        state.addresses.push(saved.clone());
        Ok(saved)
    }
}

/// Order line helper for assertions.
#[must_use]
pub fn order_item_ids(items: &[OrderItem]) -> Vec<String> {
    items.iter().map(|item| item.product.id().to_string()).collect()
}

/// Payment widget settings used in tests.
#[must_use]
pub fn payment_config() -> PaymentConfig {
    PaymentConfig {
        key_id: "rzp_test_key".to_string(),
        theme_color: "#3399cc".to_string(),
        merchant_name: "KitabWale".to_string(),
    }
}

/// Backend settings pointing at `base_url` (must end in `/`).
#[must_use]
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: url::Url::parse(base_url).unwrap(),
        timeout: Duration::from_secs(5),
        catalog_cache_ttl: Duration::from_secs(60),
    }
}

/// A full storefront config for tests.
#[must_use]
pub fn storefront_config() -> StorefrontConfig {
    StorefrontConfig {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("9fK2xQ7mLp4Zr8Vt1Wc6Yb3Nh5Jd0Gs2Ae7Uq4Io9Px1Lz6Mk3Rw8Tn5Vb2Cy0Fe".to_string()),
        api: api_config("http://127.0.0.1:9/api/"),
        payment: payment_config(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}
