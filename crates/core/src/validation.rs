//! Form rules applied before anything is sent to the backend.
//!
//! Each form has an input struct holding raw strings as submitted and a
//! `validate` method that either returns the first problem found or a typed,
//! trimmed value ready for the API client.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{BankDetails, SellerPaymentDetails};
use crate::pricing::ShippingCharge;
use crate::types::{AddressId, Email, EmailError, PaymentMode, Price};

/// Most images a listing may carry.
pub const MAX_LISTING_IMAGES: usize = 4;

/// Shortest password accepted at registration and reset.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A form field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },

    #[error("{field} must be a valid amount")]
    InvalidAmount { field: &'static str },

    #[error("{field} is not valid")]
    InvalidFormat { field: &'static str },

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("you must accept the terms and conditions")]
    TermsNotAccepted,

    #[error("final price cannot be more than the original price")]
    FinalPriceAboveMrp,

    #[error("a listing can have at most {MAX_LISTING_IMAGES} images")]
    TooManyImages,
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Required { field })
    } else {
        Ok(value)
    }
}

fn min_length<'a>(
    field: &'static str,
    value: &'a str,
    min: usize,
) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.chars().count() < min {
        Err(ValidationError::TooShort { field, min })
    } else {
        Ok(value)
    }
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn amount(field: &'static str, value: &str) -> Result<Price, ValidationError> {
    let value = required(field, value)?;
    value
        .parse::<Decimal>()
        .ok()
        .filter(|amount| amount.is_sign_positive() && !amount.is_zero())
        .map(Price::new)
        .ok_or(ValidationError::InvalidAmount { field })
}

// =============================================================================
// Addresses
// =============================================================================

/// Address form as submitted from checkout or the address book.
#[derive(Debug, Clone, Default)]
pub struct AddressInput {
    /// Set when editing an existing address.
    pub address_id: Option<AddressId>,
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone_number: String,
}

/// A trimmed address ready for `POST /user/address/create-or-update`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidAddress {
    pub address_id: Option<AddressId>,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub phone_number: String,
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns the first field shorter than its minimum length.
    pub fn validate(&self) -> Result<ValidAddress, ValidationError> {
        Ok(ValidAddress {
            address_id: self.address_id.clone(),
            line1: min_length("Address line 1", &self.line1, 5)?.to_string(),
            line2: optional(&self.line2),
            city: min_length("City", &self.city, 2)?.to_string(),
            state: min_length("State", &self.state, 2)?.to_string(),
            pincode: min_length("Pincode", &self.pincode, 6)?.to_string(),
            phone_number: min_length("Phone number", &self.phone_number, 10)?.to_string(),
        })
    }
}

// =============================================================================
// Listings
// =============================================================================

/// Post-an-ad form fields, excluding the image files themselves.
#[derive(Debug, Clone, Default)]
pub struct ListingInput {
    pub title: String,
    pub category: String,
    pub condition: String,
    pub class_type: String,
    pub subject: String,
    pub price: String,
    pub final_price: String,
    /// `free` or an amount.
    pub shipping_charge: String,
    pub author: String,
    pub edition: String,
    pub description: String,
    pub payment_mode: String,
    pub upi_id: String,
    pub account_number: String,
    pub ifsc_code: String,
    pub bank_name: String,
    pub image_count: usize,
}

/// A listing that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidListing {
    pub title: String,
    pub category: String,
    pub condition: String,
    pub class_type: String,
    pub subject: String,
    pub price: Price,
    pub final_price: Price,
    pub shipping_charge: ShippingCharge,
    pub author: String,
    pub edition: Option<String>,
    pub description: Option<String>,
    pub payment_mode: PaymentMode,
    pub payment_details: SellerPaymentDetails,
}

impl ListingInput {
    /// # Errors
    ///
    /// Returns the first missing or malformed field.
    pub fn validate(&self) -> Result<ValidListing, ValidationError> {
        let title = required("Title", &self.title)?.to_string();
        let category = required("Category", &self.category)?.to_string();
        let condition = required("Condition", &self.condition)?.to_string();
        let class_type = required("Class type", &self.class_type)?.to_string();
        let subject = required("Subject", &self.subject)?.to_string();
        let price = amount("Book MRP", &self.price)?;
        let final_price = amount("Final price", &self.final_price)?;
        if final_price > price {
            return Err(ValidationError::FinalPriceAboveMrp);
        }
        let shipping_charge = ShippingCharge::parse(&self.shipping_charge);
        let author = required("Author", &self.author)?.to_string();

        let payment_mode: PaymentMode = required("Payment mode", &self.payment_mode)?
            .parse()
            .map_err(|_| ValidationError::InvalidFormat {
                field: "Payment mode",
            })?;
        let payment_details = match payment_mode {
            PaymentMode::Upi => SellerPaymentDetails {
                upi_id: Some(validate_upi_id(&self.upi_id)?),
                bank_details: None,
            },
            PaymentMode::BankAccount => SellerPaymentDetails {
                upi_id: None,
                bank_details: Some(BankDetails {
                    account_number: validate_account_number(&self.account_number)?,
                    ifsc_code: validate_ifsc(&self.ifsc_code)?,
                    bank_name: required("Bank name", &self.bank_name)?.to_string(),
                }),
            },
        };

        if self.image_count > MAX_LISTING_IMAGES {
            return Err(ValidationError::TooManyImages);
        }

        Ok(ValidListing {
            title,
            category,
            condition,
            class_type,
            subject,
            price,
            final_price,
            shipping_charge,
            author,
            edition: optional(&self.edition),
            description: optional(&self.description),
            payment_mode,
            payment_details,
        })
    }
}

/// UPI handles look like `name@bank`.
fn validate_upi_id(raw: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "UPI ID";
    let value = required(FIELD, raw)?;
    let (handle, provider) = value
        .split_once('@')
        .ok_or(ValidationError::InvalidFormat { field: FIELD })?;
    let handle_ok = (2..=256).contains(&handle.len())
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    let provider_ok =
        (2..=64).contains(&provider.len()) && provider.chars().all(|c| c.is_ascii_alphabetic());
    if handle_ok && provider_ok {
        Ok(value.to_string())
    } else {
        Err(ValidationError::InvalidFormat { field: FIELD })
    }
}

/// Indian bank account numbers are 9 to 18 digits.
fn validate_account_number(raw: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "Account number";
    let value = required(FIELD, raw)?;
    if (9..=18).contains(&value.len()) && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(value.to_string())
    } else {
        Err(ValidationError::InvalidFormat { field: FIELD })
    }
}

/// IFSC: four letters, a literal zero, then six letters or digits.
fn validate_ifsc(raw: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "IFSC code";
    let value = required(FIELD, raw)?.to_ascii_uppercase();
    let bytes = value.as_bytes();
    let valid = bytes.len() == 11
        && bytes.iter().take(4).all(u8::is_ascii_uppercase)
        && bytes.get(4) == Some(&b'0')
        && bytes.iter().skip(5).all(u8::is_ascii_alphanumeric);
    if valid {
        Ok(value)
    } else {
        Err(ValidationError::InvalidFormat { field: FIELD })
    }
}

// =============================================================================
// Accounts
// =============================================================================

/// Sign-up form.
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub agree_terms: bool,
}

/// A registration ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub name: String,
    pub email: Email,
    pub password: String,
}

impl RegistrationInput {
    /// # Errors
    ///
    /// Returns the first missing field, a malformed email, a short password
    /// or unaccepted terms.
    pub fn validate(&self) -> Result<ValidRegistration, ValidationError> {
        let name = required("Name", &self.name)?.to_string();
        let email = Email::parse(required("Email", &self.email)?)?;
        let password = validate_password(&self.password)?;
        if !self.agree_terms {
            return Err(ValidationError::TermsNotAccepted);
        }
        Ok(ValidRegistration {
            name,
            email,
            password,
        })
    }
}

/// Login only checks presence; the backend decides the rest.
///
/// # Errors
///
/// Returns an error when either field is blank or the email is malformed.
pub fn validate_login(email: &str, password: &str) -> Result<Email, ValidationError> {
    let email = Email::parse(required("Email", email)?)?;
    required("Password", password)?;
    Ok(email)
}

/// New password plus confirmation, as on the reset-password page.
///
/// # Errors
///
/// Returns an error when the password is too short or the two differ.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<String, ValidationError> {
    let password = validate_password(password)?;
    required("Password confirmation", confirm)?;
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(password)
}

fn validate_password(raw: &str) -> Result<String, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Required { field: "Password" });
    }
    if raw.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "Password",
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(raw.to_string())
}

/// Profile form: name is required, phone is optional but must be 10+ digits.
///
/// # Errors
///
/// Returns an error for a blank name or a short or non-numeric phone number.
pub fn validate_profile(
    name: &str,
    phone_number: &str,
) -> Result<(String, Option<String>), ValidationError> {
    let name = required("Name", name)?.to_string();
    let phone = match optional(phone_number) {
        Some(phone)
            if phone.len() < 10 || !phone.chars().all(|c| c.is_ascii_digit() || c == '+') =>
        {
            return Err(ValidationError::InvalidFormat {
                field: "Phone number",
            });
        }
        other => other,
    };
    Ok((name, phone))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            address_id: None,
            line1: "12 MG Road".to_string(),
            line2: "  ".to_string(),
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            phone_number: "9876543210".to_string(),
        }
    }

    fn listing() -> ListingInput {
        ListingInput {
            title: "Concepts of Physics".to_string(),
            category: "Exam/Test Preparation Books".to_string(),
            condition: "Good".to_string(),
            class_type: "Class 12".to_string(),
            subject: "Physics".to_string(),
            price: "300".to_string(),
            final_price: "250".to_string(),
            shipping_charge: "free".to_string(),
            author: "H. C. Verma".to_string(),
            payment_mode: "UPI".to_string(),
            upi_id: "asha@okaxis".to_string(),
            image_count: 2,
            ..ListingInput::default()
        }
    }

    #[test]
    fn test_address_valid() {
        let valid = address().validate().unwrap();
        assert_eq!(valid.line1, "12 MG Road");
        assert_eq!(valid.line2, None);
    }

    #[test]
    fn test_address_minimum_lengths() {
        let cases: [(fn(&mut AddressInput), &str, usize); 5] = [
            (|a| a.line1 = "12 M".to_string(), "Address line 1", 5),
            (|a| a.city = "P".to_string(), "City", 2),
            (|a| a.state = " M ".to_string(), "State", 2),
            (|a| a.pincode = "41100".to_string(), "Pincode", 6),
            (|a| a.phone_number = "987654321".to_string(), "Phone number", 10),
        ];
        for (mutate, field, min) in cases {
            let mut input = address();
            mutate(&mut input);
            assert_eq!(
                input.validate(),
                Err(ValidationError::TooShort { field, min })
            );
        }
    }

    #[test]
    fn test_listing_valid_upi() {
        let valid = listing().validate().unwrap();
        assert_eq!(valid.final_price, Price::rupees(250));
        assert!(valid.shipping_charge.is_free());
        assert_eq!(valid.payment_details.upi_id.as_deref(), Some("asha@okaxis"));
        assert!(valid.payment_details.bank_details.is_none());
    }

    #[test]
    fn test_listing_bank_account() {
        let input = ListingInput {
            payment_mode: "Bank Account".to_string(),
            account_number: "123456789012".to_string(),
            ifsc_code: "sbin0001234".to_string(),
            bank_name: "State Bank".to_string(),
            ..listing()
        };
        let valid = input.validate().unwrap();
        let bank = valid.payment_details.bank_details.unwrap();
        assert_eq!(bank.ifsc_code, "SBIN0001234");
    }

    #[test]
    fn test_listing_rejections() {
        let bad_ifsc = ListingInput {
            payment_mode: "Bank Account".to_string(),
            account_number: "123456789012".to_string(),
            ifsc_code: "SBIN1001234".to_string(),
            bank_name: "State Bank".to_string(),
            ..listing()
        };
        assert_eq!(
            bad_ifsc.validate(),
            Err(ValidationError::InvalidFormat { field: "IFSC code" })
        );

        let bad_upi = ListingInput {
            upi_id: "asha".to_string(),
            ..listing()
        };
        assert!(bad_upi.validate().is_err());

        let too_many = ListingInput {
            image_count: 5,
            ..listing()
        };
        assert_eq!(too_many.validate(), Err(ValidationError::TooManyImages));

        let over_mrp = ListingInput {
            final_price: "350".to_string(),
            ..listing()
        };
        assert_eq!(over_mrp.validate(), Err(ValidationError::FinalPriceAboveMrp));

        let no_price = ListingInput {
            price: "abc".to_string(),
            ..listing()
        };
        assert_eq!(
            no_price.validate(),
            Err(ValidationError::InvalidAmount { field: "Book MRP" })
        );
    }

    #[test]
    fn test_registration() {
        let input = RegistrationInput {
            name: "Asha".to_string(),
            email: "Asha@Example.com".to_string(),
            password: "secret123".to_string(),
            agree_terms: true,
        };
        assert_eq!(input.validate().unwrap().email.as_str(), "asha@example.com");

        let no_terms = RegistrationInput {
            agree_terms: false,
            ..input
        };
        assert_eq!(no_terms.validate(), Err(ValidationError::TermsNotAccepted));
    }

    #[test]
    fn test_new_password_must_match() {
        assert_eq!(
            validate_new_password("secret123", "secret124"),
            Err(ValidationError::PasswordMismatch)
        );
        assert!(validate_new_password("secret123", "secret123").is_ok());
        assert!(matches!(
            validate_new_password("abc", "abc"),
            Err(ValidationError::TooShort { .. })
        ));
    }

    #[test]
    fn test_profile_phone_optional() {
        assert_eq!(
            validate_profile(" Asha ", "").unwrap(),
            ("Asha".to_string(), None)
        );
        assert!(validate_profile("Asha", "12345").is_err());
        assert!(validate_profile("", "9876543210").is_err());
    }
}
