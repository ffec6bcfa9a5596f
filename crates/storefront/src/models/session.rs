//! Session-related types.
//!
//! Types stored in the session for authentication and checkout state.

use kitabwale_core::UserId;
use kitabwale_core::models::User;
use serde::{Deserialize, Serialize};

/// Session-stored user identity.
///
/// Minimal data needed to render the header and prefill the payment widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Backend user id.
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub is_verified: bool,
}

impl CurrentUser {
    /// First name for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            phone_number: user.phone_number,
            is_verified: user.is_verified,
        }
    }
}

/// Session keys.
pub mod session_keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Backend credential cookie captured at login.
    pub const CREDENTIAL: &str = "backend_credential";

    /// Mirror of the backend cart.
    pub const CART: &str = "cart";

    /// Mirror of the backend wishlist.
    pub const WISHLIST: &str = "wishlist";

    /// Checkout step, order id and payment correlation.
    pub const CHECKOUT: &str = "checkout";
}
