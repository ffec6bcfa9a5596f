//! Shipping addresses.

use serde::{Deserialize, Serialize};

use crate::types::AddressId;

/// A shipping address from the user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(rename = "_id")]
    pub id: AddressId,
    #[serde(rename = "addressLine1")]
    pub line1: String,
    #[serde(rename = "addressLine2", default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone_number: String,
}

impl Address {
    /// `City, State - Pincode` as shown under the street lines.
    #[must_use]
    pub fn locality(&self) -> String {
        format!("{}, {} - {}", self.city, self.state, self.pincode)
    }
}

/// An order's shipping address, populated or by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AddressRef {
    Id(AddressId),
    Address(Address),
}

impl AddressRef {
    /// The referenced address id.
    #[must_use]
    pub const fn id(&self) -> &AddressId {
        match self {
            Self::Id(id) => id,
            Self::Address(address) => &address.id,
        }
    }

    /// The embedded address, if populated.
    #[must_use]
    pub const fn address(&self) -> Option<&Address> {
        match self {
            Self::Id(_) => None,
            Self::Address(address) => Some(address),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_address_wire_names() {
        let json = r#"{"_id":"a1","addressLine1":"12 MG Road","city":"Pune",
            "state":"Maharashtra","pincode":"411001","phoneNumber":"9876543210"}"#;
        let address: Address = serde_json::from_str(json).unwrap();
        assert_eq!(address.line1, "12 MG Road");
        assert_eq!(address.line2, None);
        assert_eq!(address.locality(), "Pune, Maharashtra - 411001");

        let back = serde_json::to_value(&address).unwrap();
        assert_eq!(back["addressLine1"], "12 MG Road");
        assert!(back.get("addressLine2").is_none());
    }
}
