//! KitabWale Storefront library.
//!
//! The server-rendered storefront for the KitabWale used-book marketplace:
//! catalog browsing, cart and wishlist, the cart → address → payment
//! checkout, and the account pages. All data lives in the KitabWale
//! backend; this crate keeps a per-visitor mirror of cart, wishlist and
//! checkout state in the session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod notice;
pub mod routes;
pub mod services;
pub mod state;
pub mod views;

use axum::{Router, middleware::from_fn};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use middleware::session::SessionKeyError;
use state::AppState;

/// Directory served under `/static`.
pub const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");

/// Build the full application router with every middleware layer.
///
/// # Errors
///
/// Returns an error if the session secret cannot sign cookies.
pub fn app(state: AppState) -> Result<Router, SessionKeyError> {
    let session_layer = middleware::create_session_layer(state.config())?;

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = tracing::field::Empty,
        )
    });

    Ok(Router::new()
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(from_fn(middleware::csp_nonce_middleware))
        .layer(from_fn(middleware::security_headers_middleware))
        .layer(from_fn(middleware::request_id_middleware))
        .layer(trace_layer)
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction()))
}
