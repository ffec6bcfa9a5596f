//! Backend resources as the storefront sees them.
//!
//! Field names follow the backend's JSON (`_id`, camelCase). Relations the
//! backend may or may not populate are modelled as untagged "ref" enums so a
//! bare id and an embedded document both deserialize.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod user;
pub mod wishlist;

pub use address::{Address, AddressRef};
pub use cart::{Cart, CartItem};
pub use order::{Order, OrderItem, PaymentProof, PaymentSession};
pub use product::{BankDetails, Product, ProductRef, SellerPaymentDetails};
pub use user::{User, UserRef};
pub use wishlist::Wishlist;
