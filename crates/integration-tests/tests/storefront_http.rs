//! The full storefront router served on an ephemeral port.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use kitabwale_core::pricing::ShippingCharge;
use kitabwale_integration_tests::{
    FakeBackend, USER_EMAIL, USER_PASSWORD, book, serve, storefront_config,
};
use kitabwale_storefront::app;
use kitabwale_storefront::state::AppState;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_SECURITY_POLICY, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;

async fn start(backend: FakeBackend) -> SocketAddr {
    let state = AppState::new(storefront_config(), Arc::new(backend));
    serve(app(state).unwrap()).await
}

/// A browser-like client that keeps cookies but lets tests see redirects.
fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn location(response: &reqwest::Response) -> &str {
    response.headers()[LOCATION].to_str().unwrap()
}

async fn log_in(client: &reqwest::Client, addr: SocketAddr, redirect: &str) -> reqwest::Response {
    client
        .post(format!("http://{addr}/auth/login"))
        .form(&[
            ("email", USER_EMAIL),
            ("password", USER_PASSWORD),
            ("redirect", redirect),
        ])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let addr = start(FakeBackend::default()).await;
    let response = reqwest::get(format!("http://{addr}/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "ok");

    let ready = reqwest::get(format!("http://{addr}/health/ready")).await.unwrap();
    assert_eq!(ready.status(), StatusCode::OK);
}

fn script_nonce(response: &reqwest::Response) -> String {
    let csp = response.headers()[CONTENT_SECURITY_POLICY].to_str().unwrap();
    csp.split("'nonce-")
        .nth(1)
        .and_then(|rest| rest.split('\'').next())
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_pages_carry_security_headers_and_nonce() {
    let addr = start(FakeBackend::default()).await;

    let response = reqwest::get(format!("http://{addr}/about-us")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert!(response.headers().contains_key("x-request-id"));
    let csp = response.headers()[CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(csp.contains("https://checkout.razorpay.com"));
    assert!(csp.contains("frame-ancestors 'none'"));

    let first = script_nonce(&response);
    let second = script_nonce(&reqwest::get(format!("http://{addr}/about-us")).await.unwrap());
    assert!(!first.is_empty());
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_incoming_request_id_is_echoed() {
    let addr = start(FakeBackend::default()).await;
    let response = reqwest::Client::new()
        .get(format!("http://{addr}/health"))
        .header("x-request-id", "req-42")
        .send()
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let addr = start(FakeBackend::default()).await;

    let response = browser()
        .get(format!("http://{addr}/checkout/cart"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login?redirect=%2Fcheckout%2Fcart");
}

#[tokio::test]
async fn test_login_returns_to_nested_account_page() {
    let addr = start(FakeBackend::default()).await;
    let client = browser();

    let response = client
        .get(format!("http://{addr}/account/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/auth/login?redirect=%2Faccount%2Forders");

    let login = log_in(&client, addr, "/account/orders").await;
    assert_eq!(location(&login), "/account/orders");

    let orders = client
        .get(format!("http://{addr}/account/orders"))
        .send()
        .await
        .unwrap();
    assert_eq!(orders.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_starts_a_session() {
    let backend = FakeBackend::with_products(vec![book("p1", 300, 250, ShippingCharge::Free)]);
    let addr = start(backend.clone()).await;
    let client = browser();

    let response = log_in(&client, addr, "/checkout/cart").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/checkout/cart");
    assert!(response.headers().contains_key(SET_COOKIE));

    // The session now reaches pages that need a signed-in shopper
    let add = client
        .post(format!("http://{addr}/checkout/cart/add"))
        .form(&[("product_id", "p1")])
        .send()
        .await
        .unwrap();
    assert_eq!(location(&add), "/checkout/cart?success=cart_added");
    assert_eq!(backend.state().cart.len(), 1);

    let cart = client
        .get(format!("http://{addr}/checkout/cart?success=cart_added"))
        .send()
        .await
        .unwrap();
    assert_eq!(cart.status(), StatusCode::OK);
    let body = cart.text().await.unwrap();
    assert!(body.contains("Book p1"));
    assert!(body.contains("Added to cart."));
}

#[tokio::test]
async fn test_wrong_password_returns_to_login() {
    let addr = start(FakeBackend::default()).await;

    let response = browser()
        .post(format!("http://{addr}/auth/login"))
        .form(&[("email", USER_EMAIL), ("password", "nope")])
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/auth/login?redirect=%2F&error=credentials");
}

#[tokio::test]
async fn test_open_redirect_after_login_is_refused() {
    let addr = start(FakeBackend::default()).await;
    let response = log_in(&browser(), addr, "//evil.example.com").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_ends_the_session() {
    let addr = start(FakeBackend::default()).await;
    let client = browser();
    log_in(&client, addr, "/").await;

    let response = client
        .post(format!("http://{addr}/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(location(&response), "/?success=logged_out");

    let cart = client
        .get(format!("http://{addr}/checkout/cart"))
        .send()
        .await
        .unwrap();
    assert!(cart.status().is_redirection());
}

#[tokio::test]
async fn test_unknown_notice_codes_are_ignored() {
    let addr = start(FakeBackend::default()).await;

    let body = reqwest::get(format!(
        "http://{addr}/about-us?error=%3Cscript%3Ealert(1)%3C/script%3E"
    ))
    .await
    .unwrap()
    .text()
    .await
    .unwrap();

    assert!(!body.contains("<script>alert(1)</script>"));
    assert!(!body.contains("role=\"alert\""));
}

#[tokio::test]
async fn test_unknown_book_is_not_found() {
    let addr = start(FakeBackend::default()).await;
    let response = reqwest::get(format!("http://{addr}/books/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
