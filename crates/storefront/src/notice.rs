//! One-shot notices carried across redirects as `?error=` / `?success=` codes.
//!
//! Only known codes render; anything else in the query string is ignored so
//! arbitrary text can never be injected into a page.

use kitabwale_core::checkout::CheckoutError;
use kitabwale_core::validation::ValidationError;
use serde::Deserialize;

use crate::backend::BackendError;

/// How a notice is styled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// A notice ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: &'static str,
}

impl Notice {
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, NoticeKind::Error)
    }

    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            NoticeKind::Error => "notice notice-error",
            NoticeKind::Success => "notice notice-success",
        }
    }
}

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// The notice to show, errors first.
    #[must_use]
    pub fn notice(&self) -> Option<Notice> {
        let error = self.error.as_deref().and_then(error_text).map(|text| Notice {
            kind: NoticeKind::Error,
            text,
        });
        error.or_else(|| {
            self.success
                .as_deref()
                .and_then(success_text)
                .map(|text| Notice {
                    kind: NoticeKind::Success,
                    text,
                })
        })
    }
}

/// Notice code for a rejected checkout step.
#[must_use]
pub const fn checkout_code(err: &CheckoutError) -> &'static str {
    match err {
        CheckoutError::OrderCreation(_) => "order_failed",
        CheckoutError::MissingAddress => "address_required",
        CheckoutError::OrderUpdate(_) => "order_update_failed",
        CheckoutError::PaymentInit(_) => "payment_failed",
        CheckoutError::EmptyCart => "empty_cart",
        CheckoutError::NoActiveOrder => "no_order",
        CheckoutError::NotAtStep { .. } => "checkout_step",
        CheckoutError::UnknownPaymentSession => "payment_stale",
        CheckoutError::FinalizationFailed { .. } => "payment_unconfirmed",
    }
}

/// Notice code for a rejected form.
#[must_use]
pub fn validation_code(err: &ValidationError) -> &'static str {
    match err {
        ValidationError::PasswordMismatch => "password_mismatch",
        ValidationError::TermsNotAccepted => "terms",
        ValidationError::TooShort { field: "Password", .. } => "password_too_short",
        ValidationError::TooManyImages => "listing_images",
        _ => "invalid_input",
    }
}

/// Notice code for a failed backend call, or `fallback` for rejections
/// specific to the calling page.
#[must_use]
pub const fn backend_code(err: &BackendError, fallback: &'static str) -> &'static str {
    match err {
        BackendError::Unauthorized(_) => "session_expired",
        BackendError::RateLimited(_) => "rate_limited",
        BackendError::NotFound(_) => "not_found",
        BackendError::Http(_) | BackendError::Parse(_) | BackendError::MissingData(_) => {
            "request_failed"
        }
        BackendError::Rejected { .. } => fallback,
    }
}

fn error_text(code: &str) -> Option<&'static str> {
    Some(match code {
        // Accounts
        "credentials" => "Invalid email or password.",
        "session" => "We couldn't start your session. Please try again.",
        "session_expired" => "Your session has expired. Please log in again.",
        "invalid_input" => "Please check the highlighted fields and try again.",
        "terms" => "You must accept the terms and conditions.",
        "password_mismatch" => "Passwords do not match.",
        "password_too_short" => "Password must be at least 6 characters.",
        "register_failed" => "Registration failed. The email may already be in use.",
        "verify_failed" => "This verification link is invalid or has expired.",
        "reset_failed" => "This reset link is invalid or has expired.",
        "request_failed" => "Something went wrong, please try again later.",
        "rate_limited" => "Too many requests, please wait a moment.",
        // Catalog & selling
        "not_found" => "We couldn't find that book.",
        "listing_invalid" => "Please fill in every required field of the listing.",
        "listing_images" => "A listing can have at most 4 images.",
        "listing_failed" => "Failed to list the book, please try again later.",
        "delete_failed" => "Failed to delete the listing.",
        // Cart & wishlist
        "cart_failed" => "Failed to update your cart.",
        "wishlist_failed" => "Failed to update your wishlist.",
        // Checkout
        "empty_cart" => "Your cart is empty.",
        "order_failed" => "Failed to create an order.",
        "order_update_failed" => "Failed to update your order.",
        "address_required" => "Please select a shipping address to continue.",
        "address_invalid" => "Please enter a complete address.",
        "address_failed" => "Failed to save the address.",
        "payment_failed" => "Failed to start the payment. Please try again.",
        "payment_cancelled" => "Payment was cancelled. Your order is waiting when you're ready.",
        "payment_stale" => "That payment confirmation didn't match your checkout.",
        "payment_unconfirmed" => {
            "Payment succeeded, but we couldn't confirm your order. Please check your order history."
        }
        "checkout_step" => "Please complete the checkout steps in order.",
        "no_order" => "There is no order in progress.",
        // Profile
        "profile_invalid" => "Please enter your name and a valid phone number.",
        "profile_failed" => "Failed to update your profile.",
        _ => return None,
    })
}

fn success_text(code: &str) -> Option<&'static str> {
    Some(match code {
        "registered" => "Registration successful! Please check your email to verify your account.",
        "verified" => "Your email has been verified.",
        "logged_out" => "You have been logged out.",
        "reset_sent" => "If that email is registered, a reset link is on its way.",
        "password_reset" => "Your password has been reset. Please log in.",
        "cart_added" => "Added to cart.",
        "cart_removed" => "Item removed from cart.",
        "wishlist_added" => "Added to wishlist.",
        "wishlist_removed" => "Removed from wishlist.",
        "order_created" => "Order created. Choose where to ship it.",
        "address_saved" => "Address saved.",
        "address_selected" => "Shipping address updated.",
        "listed" => "Book added successfully!",
        "deleted" => "Listing deleted.",
        "profile_updated" => "Profile updated.",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_render() {
        let query = MessageQuery {
            error: Some("empty_cart".to_string()),
            success: Some("cart_added".to_string()),
        };
        let notice = query.notice().unwrap_or_else(|| panic!("notice expected"));
        assert!(notice.is_error());
        assert_eq!(notice.text, "Your cart is empty.");
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        let query = MessageQuery {
            error: Some("<script>alert(1)</script>".to_string()),
            success: None,
        };
        assert_eq!(query.notice(), None);
    }

    #[test]
    fn test_every_checkout_code_has_text() {
        let errors = [
            CheckoutError::OrderCreation(String::new()),
            CheckoutError::MissingAddress,
            CheckoutError::EmptyCart,
            CheckoutError::UnknownPaymentSession,
            CheckoutError::PaymentInit(String::new()),
        ];
        for err in &errors {
            assert!(error_text(checkout_code(err)).is_some(), "{err:?}");
        }
    }

    #[test]
    fn test_rejected_backend_call_uses_page_code() {
        let err = BackendError::Rejected {
            status: 400,
            message: "bad".to_string(),
        };
        assert_eq!(backend_code(&err, "cart_failed"), "cart_failed");
        let err = BackendError::Unauthorized("expired".to_string());
        assert_eq!(backend_code(&err, "cart_failed"), "session_expired");
    }

    #[test]
    fn test_success_notice() {
        let query = MessageQuery {
            error: None,
            success: Some("listed".to_string()),
        };
        assert_eq!(
            query.notice().map(|n| n.kind),
            Some(NoticeKind::Success)
        );
    }
}
