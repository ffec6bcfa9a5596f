//! Newtype IDs for type-safe entity references.
//!
//! The KitabWale backend identifies every resource with an opaque string
//! (a document id). Use the `define_id!` macro to create wrappers that keep
//! a product id from being passed where an order id is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use kitabwale_core::define_id;
/// define_id!(SellerId);
/// define_id!(ListingId);
///
/// let seller = SellerId::new("64f1c0");
/// let listing = ListingId::from("64f1c0");
///
/// // These are different types, so this won't compile:
/// // let _: SellerId = listing;
/// assert_eq!(seller.as_str(), listing.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(CartId);
define_id!(CartItemId);
define_id!(WishlistId);
define_id!(OrderId);
define_id!(AddressId);
define_id!(PaymentSessionId);
define_id!(PaymentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_as_str() {
        let id = ProductId::new("65a1b2c3d4");
        assert_eq!(id.as_str(), "65a1b2c3d4");
        assert_eq!(id.to_string(), "65a1b2c3d4");
    }

    #[test]
    fn test_id_is_transparent_in_json() {
        let id = OrderId::from("ord_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ord_1\"");

        let parsed: OrderId = serde_json::from_str("\"ord_1\"").unwrap();
        assert_eq!(parsed, id);
    }
}
