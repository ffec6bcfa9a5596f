//! Static information pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::Query, response::IntoResponse};

use super::Layout;
use crate::filters;
use crate::middleware::{CspNonce, Shopper};
use crate::notice::MessageQuery;

/// About page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub layout: Layout,
}

/// Privacy policy template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/privacy.html")]
pub struct PrivacyTemplate {
    pub layout: Layout,
}

/// Terms of use template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/terms.html")]
pub struct TermsTemplate {
    pub layout: Layout,
}

pub async fn about(
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    AboutTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
    }
}

pub async fn privacy(
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    PrivacyTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
    }
}

pub async fn terms(
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    TermsTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
    }
}
