//! Discounts, shipping charges and cart price summaries.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::models::CartItem;
use crate::types::Price;

/// Whole-number percentage saved by buying at `final_price` instead of `price`.
///
/// Returns 0 when there is no saving or the cover price is not positive.
/// Halves round away from zero, so `(300, 250)` gives 17.
#[must_use]
pub fn calculate_discount(price: Price, final_price: Price) -> u32 {
    if !price.is_positive() || final_price >= price {
        return 0;
    }
    let saved = (price.amount() - final_price.amount()) / price.amount() * Decimal::ONE_HUNDRED;
    saved
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .map_or(0, |percent| percent.min(100))
}

/// A listing's shipping charge.
///
/// Sellers enter either the word `free` or an amount. Anything that does not
/// parse as a positive amount is treated as free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShippingCharge {
    #[default]
    Free,
    Amount(Price),
}

impl ShippingCharge {
    /// Parse seller input or a backend value.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("free") {
            return Self::Free;
        }
        raw.parse::<Decimal>()
            .map_or(Self::Free, |amount| Self::from_amount(Price::new(amount)))
    }

    fn from_amount(amount: Price) -> Self {
        if amount.is_positive() {
            Self::Amount(amount)
        } else {
            Self::Free
        }
    }

    /// Amount charged, zero when free.
    #[must_use]
    pub const fn amount(&self) -> Price {
        match self {
            Self::Free => Price::ZERO,
            Self::Amount(amount) => *amount,
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }

    /// The value sent to the backend (`free` or a bare amount).
    #[must_use]
    pub fn wire_value(&self) -> String {
        match self {
            Self::Free => "free".to_string(),
            Self::Amount(amount) => amount.amount().normalize().to_string(),
        }
    }
}

impl fmt::Display for ShippingCharge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Free => f.write_str("Free"),
            Self::Amount(amount) => amount.fmt(f),
        }
    }
}

impl Serialize for ShippingCharge {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.wire_value())
    }
}

impl<'de> Deserialize<'de> for ShippingCharge {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ShippingVisitor;

        impl Visitor<'_> for ShippingVisitor {
            type Value = ShippingCharge;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("\"free\", an amount string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(ShippingCharge::parse(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(ShippingCharge::from_amount(Price::new(Decimal::from(v))))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ShippingCharge::from_amount(Price::new(Decimal::from(v))))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(Decimal::try_from(v)
                    .map_or(ShippingCharge::Free, |d| ShippingCharge::from_amount(Price::new(d))))
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ShippingCharge::Free)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ShippingCharge::Free)
            }
        }

        deserializer.deserialize_any(ShippingVisitor)
    }
}

/// Totals shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub item_count: u32,
    /// Sum of cover prices.
    pub total_original: Price,
    /// Sum of asking prices.
    pub total: Price,
    pub discount: Price,
    /// Highest shipping charge among the lines.
    pub shipping: Price,
    pub final_amount: Price,
}

impl PriceSummary {
    /// Summarize cart lines.
    ///
    /// Shipping is charged once per order at the highest rate among the
    /// lines, never below zero.
    #[must_use]
    pub fn for_items(items: &[CartItem]) -> Self {
        let item_count = items.iter().map(|item| item.quantity).sum();
        let total_original: Price = items
            .iter()
            .map(|item| item.product.price.times(item.quantity))
            .sum();
        let total: Price = items
            .iter()
            .map(|item| item.product.final_price.times(item.quantity))
            .sum();
        let shipping = items
            .iter()
            .map(|item| item.product.shipping_charge.amount())
            .max()
            .unwrap_or(Price::ZERO)
            .max(Price::ZERO);

        Self {
            item_count,
            total_original,
            total,
            discount: total_original - total,
            shipping,
            final_amount: total + shipping,
        }
    }

    /// Whether a discount row should be shown.
    #[must_use]
    pub const fn has_discount(&self) -> bool {
        self.discount.is_positive()
    }
}
