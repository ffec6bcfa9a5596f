//! KitabWale Core - Shared domain library.
//!
//! This crate provides the types and rules used by the KitabWale storefront:
//! - `storefront` - Server-rendered marketplace for used books
//! - `integration-tests` - Cross-crate checkout and API client tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no HTTP
//! clients, no session handling. The storefront owns every call to the
//! KitabWale backend and feeds the results through the types defined here.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, emails and order statuses
//! - [`models`] - Backend resources (books, carts, wishlists, orders, addresses, users)
//! - [`pricing`] - Discount percentages and cart price summaries
//! - [`catalog`] - Filtering, sorting and paging of book listings
//! - [`validation`] - Form rules for addresses, listings and accounts
//! - [`mirror`] - Session-local mirrors of the backend cart and wishlist
//! - [`checkout`] - The cart → address → payment state machine

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod mirror;
pub mod models;
pub mod pricing;
pub mod types;
pub mod validation;

pub use types::*;
