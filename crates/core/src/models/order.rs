//! Orders and payment correlation data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AddressRef, CartItem, ProductRef, UserRef};
use crate::types::{OrderId, OrderStatus, PaymentId, PaymentSessionId, Price};

/// An order created from a cart snapshot during checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
    pub items: Vec<OrderItem>,
    pub total_amount: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<AddressRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentProof>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Total number of books in the order.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the backend recorded payment correlation data.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        self.payment_details.is_some()
    }
}

/// An order line. The product may be a bare id or a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product: ProductRef,
    pub quantity: u32,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product: ProductRef::Product(Box::new(item.product.clone())),
            quantity: item.quantity,
        }
    }
}

/// Payment-session descriptor issued by the backend for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub id: PaymentSessionId,
    /// Amount in paise.
    pub amount: u64,
    pub currency: String,
}

/// The three correlation fields the payment widget hands back on success.
///
/// Forwarded to the backend verbatim; the signature is never checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub razorpay_order_id: PaymentSessionId,
    pub razorpay_payment_id: PaymentId,
    pub razorpay_signature: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_with_populated_relations() {
        let json = r#"{
            "_id": "o1",
            "user": "u1",
            "items": [{"product": "p1", "quantity": 2}],
            "totalAmount": 500,
            "shippingAddress": {"_id":"a1","addressLine1":"12 MG Road","city":"Pune",
                "state":"Maharashtra","pincode":"411001","phoneNumber":"9876543210"},
            "status": "shipped",
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.shipping_address.as_ref().unwrap().id().as_str(), "a1");
        assert!(!order.is_paid());
    }

    #[test]
    fn test_order_defaults_to_processing() {
        let json = r#"{"_id":"o1","items":[{"product":"p1","quantity":1}],"totalAmount":250}"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Processing);
        assert!(order.shipping_address.is_none());
    }

    #[test]
    fn test_payment_proof_wire_names() {
        let proof = PaymentProof {
            razorpay_order_id: PaymentSessionId::new("order_X"),
            razorpay_payment_id: PaymentId::new("pay_Y"),
            razorpay_signature: "sig".to_string(),
        };
        let value = serde_json::to_value(&proof).unwrap();
        assert_eq!(value["razorpay_order_id"], "order_X");
        assert_eq!(value["razorpay_payment_id"], "pay_Y");
        assert_eq!(value["razorpay_signature"], "sig");
    }
}
