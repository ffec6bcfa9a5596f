//! Account route handlers.
//!
//! These routes require authentication: profile, order history, wishlist,
//! address book and the seller's own listings.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use kitabwale_core::models::{Address, Order, Product};
use kitabwale_core::validation::AddressInput;
use kitabwale_core::{OrderId, Price, ProductId};
use serde::Deserialize;
use tracing::instrument;

use super::checkout::AddressForm;
use super::{Layout, redirect_error, redirect_success, save_then};
use crate::backend::BackendError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, SignedInShopper};
use crate::notice::{MessageQuery, backend_code, validation_code};
use crate::services::{AddressResolver, AuthError, AuthService, WishlistService};
use crate::state::AppState;
use crate::views::{StatusStage, listed_ago, status_stages};

// =============================================================================
// View Types
// =============================================================================

/// One row of the order history.
#[derive(Debug, Clone)]
pub struct OrderRow {
    pub id: String,
    pub placed: String,
    pub total: Price,
    pub status: &'static str,
    pub item_count: u32,
}

impl From<&Order> for OrderRow {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            placed: listed_ago(order.created_at),
            total: order.total_amount,
            status: order.status.label(),
            item_count: order.item_count(),
        }
    }
}

/// One line of an order's detail page.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub product_id: String,
    pub title: String,
    pub image: Option<String>,
    pub price: Option<Price>,
    pub quantity: u32,
}

/// A listing in the seller's dashboard.
#[derive(Debug, Clone)]
pub struct ListingRow {
    pub product: Product,
    pub listed: String,
}

// =============================================================================
// Form Types
// =============================================================================

/// Profile form data.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub name: String,
    #[serde(default)]
    pub phone_number: String,
}

/// Wishlist removal form data.
#[derive(Debug, Deserialize)]
pub struct RemoveWishlistForm {
    pub product_id: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Profile page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub is_verified: bool,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub orders: Vec<OrderRow>,
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/order_detail.html")]
pub struct OrderDetailTemplate {
    pub layout: Layout,
    pub order: OrderRow,
    pub lines: Vec<OrderLine>,
    pub stages: Vec<StatusStage>,
    pub shipping_address: Option<Address>,
    pub paid: bool,
}

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/wishlist.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<Product>,
}

/// Address book page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/addresses.html")]
pub struct AddressesTemplate {
    pub layout: Layout,
    pub addresses: Vec<Address>,
}

/// Seller listings page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/listings.html")]
pub struct ListingsTemplate {
    pub layout: Layout,
    pub listings: Vec<ListingRow>,
}

// =============================================================================
// Profile
// =============================================================================

/// Display the profile page.
pub async fn profile(
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<ProfileTemplate> {
    let user = shopper
        .ctx
        .user()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("no signed-in user".to_string()))?;
    Ok(ProfileTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        name: user.name,
        email: user.email,
        phone_number: user.phone_number.unwrap_or_default(),
        is_verified: user.is_verified,
    })
}

/// Update name and phone number.
#[instrument(skip(state, shopper, form))]
pub async fn update_profile(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<ProfileForm>,
) -> Response {
    let response = match AuthService::new(state.backend())
        .update_profile(&mut shopper.ctx, &form.name, &form.phone_number)
        .await
    {
        Ok(()) => redirect_success("/account", "profile_updated"),
        Err(AuthError::Validation(e)) => redirect_error("/account", validation_code(&e)),
        Err(AuthError::Backend(BackendError::Unauthorized(_))) => {
            return AppError::Unauthorized("credential rejected".to_string()).into_response();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Profile update failed");
            redirect_error("/account", "profile_failed")
        }
    };
    save_then(&shopper, response).await
}

// =============================================================================
// Orders
// =============================================================================

/// Display the order history, newest first.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn orders(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<OrdersTemplate> {
    let credential = shopper.ctx.credential()?;
    let mut orders = state.backend().orders(&credential).await?;
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(OrdersTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        orders: orders.iter().map(OrderRow::from).collect(),
    })
}

/// Display one order with its status timeline.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn order_detail(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Path(id): Path<String>,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<OrderDetailTemplate> {
    let credential = shopper.ctx.credential()?;
    let order = state
        .backend()
        .order(&credential, &OrderId::new(id))
        .await
        .map_err(|e| match e {
            BackendError::NotFound(_) => AppError::NotFound(e.to_string()),
            other => AppError::Backend(other),
        })?;

    let lines = order
        .items
        .iter()
        .map(|item| {
            let product = item.product.product();
            OrderLine {
                product_id: item.product.id().to_string(),
                title: product.map_or_else(|| "Book".to_string(), |p| p.title.clone()),
                image: product.and_then(Product::cover_image).map(ToString::to_string),
                price: product.map(|p| p.final_price),
                quantity: item.quantity,
            }
        })
        .collect();

    Ok(OrderDetailTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        order: OrderRow::from(&order),
        lines,
        stages: status_stages(order.status),
        shipping_address: order
            .shipping_address
            .as_ref()
            .and_then(|address| address.address().cloned()),
        paid: order.is_paid(),
    })
}

// =============================================================================
// Wishlist
// =============================================================================

/// Display the wishlist, refreshed from the backend.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn wishlist(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<Response> {
    shopper.ctx.refresh_wishlist(state.backend()).await?;

    let page = WishlistTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        products: shopper.ctx.wishlist.products().cloned().collect(),
    };
    Ok(save_then(&shopper, page.into_response()).await)
}

/// Remove a book from the wishlist.
#[instrument(skip(state, shopper, form))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    SignedInShopper(mut shopper): SignedInShopper,
    Form(form): Form<RemoveWishlistForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);
    let response = match WishlistService::new(state.backend())
        .remove(&mut shopper.ctx, &product_id)
        .await
    {
        Ok(_) => redirect_success("/account/wishlist", "wishlist_removed"),
        Err(e) => {
            tracing::warn!(error = %e, "Wishlist removal failed");
            redirect_error("/account/wishlist", backend_code(&e, "wishlist_failed"))
        }
    };
    save_then(&shopper, response).await
}

// =============================================================================
// Addresses
// =============================================================================

/// Display the address book.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn addresses(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<AddressesTemplate> {
    let addresses = AddressResolver::new(state.backend())
        .list(&shopper.ctx)
        .await?;
    Ok(AddressesTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        addresses,
    })
}

/// Create or update an address-book entry.
#[instrument(skip(state, shopper, form))]
pub async fn save_address(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Form(form): Form<AddressForm>,
) -> Response {
    let valid = match AddressInput::from(form).validate() {
        Ok(valid) => valid,
        Err(e) => return redirect_error("/account/addresses", validation_code(&e)),
    };

    match AddressResolver::new(state.backend())
        .save(&shopper.ctx, &valid)
        .await
    {
        Ok(_) => redirect_success("/account/addresses", "address_saved"),
        Err(e) => {
            tracing::warn!(error = %e, "Address save failed");
            redirect_error("/account/addresses", backend_code(&e, "address_failed"))
        }
    }
}

// =============================================================================
// Listings
// =============================================================================

/// Display the books this user has listed for sale.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn listings(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<ListingsTemplate> {
    let (user, credential) = shopper.ctx.session()?;
    let mut products = state
        .backend()
        .seller_products(credential, &user.id)
        .await?;
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(ListingsTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        listings: products
            .into_iter()
            .map(|product| ListingRow {
                listed: listed_ago(product.created_at),
                product,
            })
            .collect(),
    })
}

/// Take a listing down.
#[instrument(skip(state, shopper))]
pub async fn delete_listing(
    State(state): State<AppState>,
    SignedInShopper(shopper): SignedInShopper,
    Path(id): Path<String>,
) -> Response {
    let credential = match shopper.ctx.credential() {
        Ok(credential) => credential,
        Err(e) => return AppError::from(e).into_response(),
    };
    let product_id = ProductId::new(id);

    match state
        .backend()
        .delete_product(&credential, &product_id)
        .await
    {
        Ok(()) => {
            add_breadcrumb(
                "listing",
                "Listing deleted",
                Some(&[("product_id", product_id.as_str())]),
            );
            redirect_success("/account/listings", "deleted")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Listing deletion failed");
            redirect_error("/account/listings", backend_code(&e, "delete_failed"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kitabwale_core::OrderStatus;
    use kitabwale_core::models::{OrderItem, ProductRef};

    use super::*;

    #[test]
    fn test_order_row_from_order() {
        let order = Order {
            id: OrderId::new("o1"),
            user: None,
            items: vec![
                OrderItem {
                    product: ProductRef::Id(ProductId::new("p1")),
                    quantity: 2,
                },
                OrderItem {
                    product: ProductRef::Id(ProductId::new("p2")),
                    quantity: 1,
                },
            ],
            total_amount: Price::rupees(640),
            shipping_address: None,
            payment_details: None,
            status: OrderStatus::Shipped,
            payment_status: None,
            created_at: None,
        };

        let row = OrderRow::from(&order);
        assert_eq!(row.id, "o1");
        assert_eq!(row.item_count, 3);
        assert_eq!(row.total, Price::rupees(640));
        assert_eq!(row.status, OrderStatus::Shipped.label());
    }
}
