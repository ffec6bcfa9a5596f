//! Status enums for orders.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order, owned by the backend.
///
/// Orders start as `processing`; the backend moves them forward. The
/// storefront only reads this value to render order history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Statuses in the order they are displayed on the progress tracker.
    pub const ALL: [Self; 4] = [
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Title-cased label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Position on the progress tracker.
    #[must_use]
    pub const fn progress_index(&self) -> usize {
        match self {
            Self::Processing => 0,
            Self::Shipped => 1,
            Self::Delivered => 2,
            Self::Cancelled => 3,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How a seller wants to receive money for a sold book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMode {
    #[serde(rename = "UPI")]
    Upi,
    #[serde(rename = "Bank Account")]
    BankAccount,
}

impl PaymentMode {
    /// Wire value, also used as the form value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upi => "UPI",
            Self::BankAccount => "Bank Account",
        }
    }
}

impl std::str::FromStr for PaymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPI" => Ok(Self::Upi),
            "Bank Account" => Ok(Self::BankAccount),
            _ => Err(format!("invalid payment mode: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_wire_format() {
        let status: OrderStatus = serde_json::from_str("\"shipped\"").unwrap();
        assert_eq!(status, OrderStatus::Shipped);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Cancelled).unwrap(),
            "\"cancelled\""
        );
    }

    #[test]
    fn test_order_status_progress_follows_display_order() {
        for (index, status) in OrderStatus::ALL.iter().enumerate() {
            assert_eq!(status.progress_index(), index);
        }
    }

    #[test]
    fn test_order_status_from_str_is_case_insensitive() {
        assert_eq!("Delivered".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_payment_mode_wire_names() {
        assert_eq!(
            serde_json::to_string(&PaymentMode::BankAccount).unwrap(),
            "\"Bank Account\""
        );
        assert_eq!("UPI".parse::<PaymentMode>(), Ok(PaymentMode::Upi));
    }
}
