//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use kitabwale_core::catalog::{self, CATEGORIES, NEW_ARRIVALS};
use kitabwale_core::models::Product;
use tracing::instrument;

use super::Layout;
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::notice::MessageQuery;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub new_arrivals: Vec<Product>,
    pub categories: &'static [&'static str],
}

/// Display the home page.
///
/// A backend outage shows the page without new arrivals.
#[instrument(skip(state, shopper, query, nonce))]
pub async fn home(
    State(state): State<AppState>,
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    let new_arrivals = match state.backend().products().await {
        Ok(products) => catalog::newest(&products, NEW_ARRIVALS),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to fetch new arrivals");
            Vec::new()
        }
    };

    HomeTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        new_arrivals,
        categories: CATEGORIES,
    }
}
