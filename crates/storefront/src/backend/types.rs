//! Request and response bodies for the backend REST API.

use kitabwale_core::models::{Address, OrderItem, PaymentProof, PaymentSession};
use kitabwale_core::validation::{ValidAddress, ValidListing};
use kitabwale_core::{AddressId, OrderId, Price, ProductId};
use serde::{Deserialize, Serialize};

/// The `{ success, message, data }` wrapper around every response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

/// Envelope whose `data` we never look at.
pub type MessageEnvelope = Envelope<serde::de::IgnoredAny>;

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub agree_terms: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct EmailRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ResetPasswordRequest<'a> {
    pub new_password: &'a str,
}

/// `PUT /user/profile/update/{userId}` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

// =============================================================================
// Listings
// =============================================================================

/// An uploaded listing photo.
#[derive(Debug, Clone)]
pub struct ListingImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A validated listing plus its photos, sent as multipart form data.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub listing: ValidListing,
    pub images: Vec<ListingImage>,
}

impl NewListing {
    /// Text fields in the order the backend expects them.
    ///
    /// `paymentDetails` travels as a JSON string inside the form.
    pub fn text_fields(&self) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
        let listing = &self.listing;
        let mut fields = vec![
            ("title", listing.title.clone()),
            ("category", listing.category.clone()),
            ("condition", listing.condition.clone()),
            ("classType", listing.class_type.clone()),
            ("subject", listing.subject.clone()),
            ("price", listing.price.amount().normalize().to_string()),
            ("finalPrice", listing.final_price.amount().normalize().to_string()),
            ("shippingCharge", listing.shipping_charge.wire_value()),
            ("author", listing.author.clone()),
            ("paymentMode", listing.payment_mode.as_str().to_string()),
            (
                "paymentDetails",
                serde_json::to_string(&listing.payment_details)?,
            ),
        ];
        if let Some(edition) = &listing.edition {
            fields.push(("edition", edition.clone()));
        }
        if let Some(description) = &listing.description {
            fields.push(("description", description.clone()));
        }
        Ok(fields)
    }
}

// =============================================================================
// Cart & wishlist
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddToCartRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WishlistRequest<'a> {
    pub product_id: &'a ProductId,
}

// =============================================================================
// Orders
// =============================================================================

/// `POST /order` body: a snapshot of the cart and what it costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
}

/// `PATCH /order` body. Only the fields being changed are sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPatch {
    pub order_id: OrderId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentProof>,
}

impl OrderPatch {
    #[must_use]
    pub const fn shipping_address(order_id: OrderId, address: Address) -> Self {
        Self {
            order_id,
            shipping_address: Some(address),
            payment_details: None,
        }
    }

    #[must_use]
    pub const fn payment(order_id: OrderId, proof: PaymentProof) -> Self {
        Self {
            order_id,
            shipping_address: None,
            payment_details: Some(proof),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PaymentSessionRequest<'a> {
    pub order_id: &'a OrderId,
}

/// `data` of `POST /order/payment-razorpay`.
#[derive(Debug, Deserialize)]
pub(super) struct PaymentSessionData {
    pub order: PaymentSession,
}

// =============================================================================
// Addresses
// =============================================================================

/// `data` of `GET /user/address`.
#[derive(Debug, Deserialize)]
pub(super) struct AddressesData {
    #[serde(default)]
    pub addresses: Vec<Address>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SaveAddressRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<&'a AddressId>,
    pub address_line1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<&'a str>,
    pub city: &'a str,
    pub state: &'a str,
    pub pincode: &'a str,
    pub phone_number: &'a str,
}

impl<'a> From<&'a ValidAddress> for SaveAddressRequest<'a> {
    fn from(address: &'a ValidAddress) -> Self {
        Self {
            address_id: address.address_id.as_ref(),
            address_line1: &address.line1,
            address_line2: address.line2.as_deref(),
            city: &address.city,
            state: &address.state,
            pincode: &address.pincode,
            phone_number: &address.phone_number,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kitabwale_core::{PaymentId, PaymentSessionId};

    use super::*;

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<Address> =
            serde_json::from_str(r#"{"success":false,"message":"Invalid token"}"#).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.message.as_deref(), Some("Invalid token"));
        assert!(envelope.data.is_none());
    }

    #[test]
    fn test_payment_patch_body() {
        let patch = OrderPatch::payment(
            OrderId::new("o1"),
            PaymentProof {
                razorpay_order_id: PaymentSessionId::new("order_X"),
                razorpay_payment_id: PaymentId::new("pay_Y"),
                razorpay_signature: "sig".to_string(),
            },
        );
        let body = serde_json::to_value(&patch).unwrap();
        assert_eq!(body["orderId"], "o1");
        assert_eq!(body["paymentDetails"]["razorpay_signature"], "sig");
        assert!(body.get("shippingAddress").is_none());
    }

    #[test]
    fn test_save_address_body() {
        let address = ValidAddress {
            address_id: Some(AddressId::new("a1")),
            line1: "12 MG Road".to_string(),
            line2: None,
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            phone_number: "9876543210".to_string(),
        };
        let body = serde_json::to_value(SaveAddressRequest::from(&address)).unwrap();
        assert_eq!(body["addressId"], "a1");
        assert_eq!(body["addressLine1"], "12 MG Road");
        assert!(body.get("addressLine2").is_none());
    }
}
