//! Catalog route handlers.
//!
//! The backend returns every listing; filtering, search, sorting and paging
//! run here over the cached list.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, RawQuery, State},
    response::{IntoResponse, Response},
};
use kitabwale_core::ProductId;
use kitabwale_core::catalog::{BookPage, BookQuery, FilterField, SortOption};
use kitabwale_core::models::Product;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, login_required, redirect_error, redirect_success, save_then};
use crate::backend::BackendError;
use crate::error::AppError;
use crate::filters;
use crate::middleware::auth::safe_redirect_target;
use crate::middleware::{CspNonce, Shopper};
use crate::notice::{MessageQuery, backend_code};
use crate::services::{WishlistChange, WishlistService};
use crate::state::AppState;
use crate::views::listed_ago;

// =============================================================================
// View Types
// =============================================================================

/// A checkbox in a filter group.
#[derive(Debug, Clone)]
pub struct FilterOptionView {
    pub value: &'static str,
    pub checked: bool,
}

/// A multi-select filter group.
#[derive(Debug, Clone)]
pub struct FilterGroupView {
    pub key: &'static str,
    pub label: &'static str,
    pub options: Vec<FilterOptionView>,
}

/// A sort dropdown entry.
#[derive(Debug, Clone)]
pub struct SortOptionView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn filter_groups(query: &BookQuery) -> Vec<FilterGroupView> {
    FilterField::ALL
        .into_iter()
        .map(|field| FilterGroupView {
            key: field.key(),
            label: field.label(),
            options: field
                .options()
                .iter()
                .map(|&value| FilterOptionView {
                    value,
                    checked: query.is_selected(field, value),
                })
                .collect(),
        })
        .collect()
}

fn sort_options(query: &BookQuery) -> Vec<SortOptionView> {
    SortOption::ALL
        .into_iter()
        .map(|sort| SortOptionView {
            value: sort.as_str(),
            label: sort.label(),
            selected: sort == query.sort,
        })
        .collect()
}

/// `/books?...` for `query` at `page`.
fn page_url(query: &BookQuery, page: usize) -> String {
    let pairs = query.pairs_for_page(page);
    if pairs.is_empty() {
        return "/books".to_string();
    }
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    format!("/books?{encoded}")
}

// =============================================================================
// Templates
// =============================================================================

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "books/index.html")]
pub struct BooksIndexTemplate {
    pub layout: Layout,
    pub results: BookPage,
    pub search: String,
    pub filter_groups: Vec<FilterGroupView>,
    pub sorts: Vec<SortOptionView>,
    pub previous_url: Option<String>,
    pub next_url: Option<String>,
}

/// Book detail template.
#[derive(Template, WebTemplate)]
#[template(path = "books/show.html")]
pub struct BookShowTemplate {
    pub layout: Layout,
    pub book: Product,
    pub listed_ago: String,
    pub in_cart: bool,
    pub in_wishlist: bool,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the catalog.
///
/// # Errors
///
/// Returns an error if the listings cannot be fetched.
#[instrument(skip(state, shopper, raw, nonce))]
pub async fn index(
    State(state): State<AppState>,
    shopper: Shopper,
    RawQuery(raw): RawQuery,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let raw = raw.unwrap_or_default();
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();
    let query = BookQuery::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    let messages = MessageQuery {
        error: pairs
            .iter()
            .find(|(k, _)| k == "error")
            .map(|(_, v)| v.clone()),
        success: pairs
            .iter()
            .find(|(k, _)| k == "success")
            .map(|(_, v)| v.clone()),
    };

    let products = state.backend().products().await?;
    let results = query.apply(&products);

    Ok(BooksIndexTemplate {
        layout: Layout::new(&shopper.ctx, &messages, nonce),
        previous_url: results
            .has_previous()
            .then(|| page_url(&query, results.page - 1)),
        next_url: results.has_next().then(|| page_url(&query, results.page + 1)),
        search: query.search.clone().unwrap_or_default(),
        filter_groups: filter_groups(&query),
        sorts: sort_options(&query),
        results,
    })
}

/// Display a book.
///
/// # Errors
///
/// Returns 404 if the listing does not exist.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> Result<impl IntoResponse, AppError> {
    let id = ProductId::new(id);
    let book = state.backend().product(&id).await.map_err(|e| match e {
        BackendError::NotFound(_) => AppError::NotFound(format!("book {id}")),
        other => AppError::Backend(other),
    })?;

    Ok(BookShowTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        listed_ago: listed_ago(book.created_at),
        in_cart: shopper.ctx.cart.contains(&id),
        in_wishlist: shopper.ctx.wishlist.contains(&id),
        book,
    })
}

/// Wishlist toggle form data.
#[derive(Debug, Deserialize)]
pub struct WishlistForm {
    pub product_id: String,
    pub return_to: Option<String>,
}

/// Add or remove a book from the wishlist.
#[instrument(skip(state, shopper, form))]
pub async fn toggle_wishlist(
    State(state): State<AppState>,
    mut shopper: Shopper,
    Form(form): Form<WishlistForm>,
) -> Response {
    if let Some(redirect) = login_required(&shopper, form.return_to.as_deref()) {
        return redirect;
    }
    let return_to = safe_redirect_target(form.return_to.as_deref()).to_string();
    let product_id = ProductId::new(form.product_id);

    let response = match WishlistService::new(state.backend())
        .toggle(&mut shopper.ctx, &product_id)
        .await
    {
        Ok(WishlistChange::Added) => redirect_success(&return_to, "wishlist_added"),
        Ok(WishlistChange::Removed | WishlistChange::Unchanged) => {
            redirect_success(&return_to, "wishlist_removed")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Wishlist toggle failed");
            redirect_error(&return_to, backend_code(&e, "wishlist_failed"))
        }
    };
    save_then(&shopper, response).await
}
