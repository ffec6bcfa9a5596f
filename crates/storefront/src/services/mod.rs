//! Business logic services for storefront.
//!
//! # Services
//!
//! - `store_context` - Per-visitor state loaded from the session
//! - `auth` - Accounts (register, login, verification, profile)
//! - `cart` / `wishlist` - Mirror mutations
//! - `orders` - Order Coordinator
//! - `address` - Address Resolver
//! - `payment` - Payment Initiator and the widget boundary
//! - `checkout` - The step machine over all of the above

pub mod address;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod payment;
pub mod store_context;
pub mod wishlist;

pub use address::AddressResolver;
pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use checkout::{CheckoutService, ProceedOutcome, Settlement};
pub use orders::{OrderChange, OrderCoordinator};
pub use payment::{
    ChannelWidget, PaymentInitiator, PaymentWidget, WidgetOptions, WidgetOutcome, WidgetRequest,
};
pub use store_context::StoreContext;
pub use wishlist::{WishlistChange, WishlistService};
