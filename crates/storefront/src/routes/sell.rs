//! Post-an-ad route handlers.
//!
//! Sellers fill in the book details, how they want to be paid, and up to
//! four photos. The form is multipart; photos are forwarded to the backend
//! unchanged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Query, State, multipart::MultipartError},
    response::{IntoResponse, Response},
};
use kitabwale_core::PaymentMode;
use kitabwale_core::catalog::{CATEGORIES, CLASS_TYPES, CONDITIONS};
use kitabwale_core::validation::{ListingInput, MAX_LISTING_IMAGES};
use tracing::instrument;

use super::{Layout, redirect_error, redirect_success};
use crate::backend::{ListingImage, NewListing};
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{CspNonce, SignedInShopper};
use crate::notice::{MessageQuery, backend_code, validation_code};
use crate::state::AppState;

/// Request body limit for the listing form.
pub const MAX_UPLOAD_BYTES: usize = 24 * 1024 * 1024;

const IMAGE_FIELD: &str = "images";

/// Post-an-ad page template.
#[derive(Template, WebTemplate)]
#[template(path = "sell/form.html")]
pub struct SellTemplate {
    pub layout: Layout,
    pub categories: &'static [&'static str],
    pub conditions: &'static [&'static str],
    pub class_types: &'static [&'static str],
    pub payment_modes: [&'static str; 2],
    pub max_images: usize,
}

/// Display the post-an-ad form.
pub async fn form(
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    SellTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        categories: CATEGORIES,
        conditions: CONDITIONS,
        class_types: CLASS_TYPES,
        payment_modes: [PaymentMode::Upi.as_str(), PaymentMode::BankAccount.as_str()],
        max_images: MAX_LISTING_IMAGES,
    }
}

/// Create a listing.
#[instrument(skip(state, shopper, multipart))]
pub async fn create(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    multipart: Multipart,
) -> Response {
    let (input, images) = match read_listing(multipart).await {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed listing upload");
            return redirect_error("/book-sell", "listing_failed");
        }
    };

    let listing = match input.validate() {
        Ok(listing) => listing,
        Err(e) => return redirect_error("/book-sell", validation_code(&e)),
    };

    let credential = match shopper.ctx.credential() {
        Ok(credential) => credential,
        Err(e) => return crate::error::AppError::from(e).into_response(),
    };

    match state
        .backend()
        .create_product(&credential, NewListing { listing, images })
        .await
    {
        Ok(product) => {
            tracing::info!(product_id = %product.id, "Listing created");
            add_breadcrumb(
                "listing",
                "Listing created",
                Some(&[("product_id", product.id.as_str())]),
            );
            redirect_success("/account/listings", "listed")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Listing creation failed");
            redirect_error("/book-sell", backend_code(&e, "listing_failed"))
        }
    }
}

/// Split the multipart body into text fields and photos.
///
/// Empty file inputs are skipped. Every photo is counted, so more than
/// [`MAX_LISTING_IMAGES`] fails validation rather than being truncated.
async fn read_listing(
    mut multipart: Multipart,
) -> Result<(ListingInput, Vec<ListingImage>), MultipartError> {
    let mut input = ListingInput::default();
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            if file_name.is_empty() || bytes.is_empty() {
                continue;
            }
            images.push(ListingImage {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field.text().await?;
        set_text_field(&mut input, &name, value);
    }

    input.image_count = images.len();
    Ok((input, images))
}

fn set_text_field(input: &mut ListingInput, name: &str, value: String) {
    let slot = match name {
        "title" => &mut input.title,
        "category" => &mut input.category,
        "condition" => &mut input.condition,
        "classType" => &mut input.class_type,
        "subject" => &mut input.subject,
        "price" => &mut input.price,
        "finalPrice" => &mut input.final_price,
        "shippingCharge" => &mut input.shipping_charge,
        "author" => &mut input.author,
        "edition" => &mut input.edition,
        "description" => &mut input.description,
        "paymentMode" => &mut input.payment_mode,
        "upiId" => &mut input.upi_id,
        "accountNumber" => &mut input.account_number,
        "ifscCode" => &mut input.ifsc_code,
        "bankName" => &mut input.bank_name,
        _ => return,
    };
    *slot = value;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_text_field_maps_form_names() {
        let mut input = ListingInput::default();
        set_text_field(&mut input, "classType", "Class 12".to_string());
        set_text_field(&mut input, "finalPrice", "250".to_string());
        set_text_field(&mut input, "upiId", "asha@upi".to_string());
        set_text_field(&mut input, "unknown", "ignored".to_string());

        assert_eq!(input.class_type, "Class 12");
        assert_eq!(input.final_price, "250");
        assert_eq!(input.upi_id, "asha@upi");
        assert!(input.title.is_empty());
    }
}
