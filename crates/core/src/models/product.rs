//! Book listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserRef;
use crate::pricing::{ShippingCharge, calculate_discount};
use crate::types::{PaymentMode, Price, ProductId};

/// A used book listed for sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub condition: String,
    #[serde(default)]
    pub class_type: String,
    /// Original (cover) price.
    pub price: Price,
    /// Asking price.
    pub final_price: Price,
    #[serde(default)]
    pub shipping_charge: ShippingCharge,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub edition: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub seller: Option<UserRef>,
    #[serde(default)]
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub payment_details: Option<SellerPaymentDetails>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Percentage saved against the cover price.
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        calculate_discount(self.price, self.final_price)
    }

    /// First image, used as the listing thumbnail.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Seller display name when the backend populated it.
    #[must_use]
    pub fn seller_name(&self) -> Option<&str> {
        self.seller.as_ref().and_then(UserRef::name)
    }
}

/// Where the seller receives payouts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerPaymentDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
}

/// Bank account payout details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
}

/// A product reference that may or may not be populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    Id(ProductId),
    Product(Box<Product>),
}

impl ProductRef {
    /// The referenced product id.
    #[must_use]
    pub fn id(&self) -> &ProductId {
        match self {
            Self::Id(id) => id,
            Self::Product(product) => &product.id,
        }
    }

    /// The embedded product, if populated.
    #[must_use]
    pub fn product(&self) -> Option<&Product> {
        match self {
            Self::Id(_) => None,
            Self::Product(product) => Some(product),
        }
    }
}
