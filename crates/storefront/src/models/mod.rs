//! Storefront-local models.
//!
//! Backend resources live in `kitabwale_core::models`; this module holds
//! only what the storefront keeps in the visitor's session.

pub mod session;

pub use session::{CurrentUser, session_keys};
