//! Authentication middleware and extractors.
//!
//! - [`Shopper`]: the visitor's whole [`StoreContext`], signed in or not.
//! - [`SignedInShopper`]: a [`Shopper`] that must be signed in.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::services::StoreContext;

/// Login page URL that returns to `path` afterwards.
#[must_use]
pub fn login_redirect_url(path: &str) -> String {
    if path.is_empty() || path == "/" {
        "/auth/login".to_string()
    } else {
        format!("/auth/login?redirect={}", urlencoding::encode(path))
    }
}

/// Only same-site paths are followed after login.
#[must_use]
pub fn safe_redirect_target(target: Option<&str>) -> &str {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

/// Error returned when authentication is required but the visitor is not
/// logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to this path afterwards.
    RedirectToLogin(String),
    /// The session layer is missing.
    NoSession,
    /// The session store failed.
    Session(tower_sessions::session::Error),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(path) => Redirect::to(&login_redirect_url(&path)).into_response(),
            Self::NoSession => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            Self::Session(err) => {
                tracing::error!(error = %err, "Session store error");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn session_from(parts: &Parts) -> Result<Session, AuthRejection> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(AuthRejection::NoSession)
}

/// Full request path, including any prefix stripped by nested routers.
fn original_path(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |OriginalUri(uri)| uri);
    uri.path_and_query()
        .map_or_else(|| uri.path().to_string(), ToString::to_string)
}

/// The visitor's store context, loaded from the session.
///
/// Handlers that change it call [`Shopper::save`] before responding.
pub struct Shopper {
    pub ctx: StoreContext,
    session: Session,
}

impl Shopper {
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Persist the context back into the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.ctx.save(&self.session).await
    }

    /// Mutable access to the context and the session at once.
    pub fn parts_mut(&mut self) -> (&mut StoreContext, &Session) {
        (&mut self.ctx, &self.session)
    }
}

impl<S> FromRequestParts<S> for Shopper
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        let ctx = StoreContext::load(&session)
            .await
            .map_err(AuthRejection::Session)?;
        Ok(Self { ctx, session })
    }
}

/// A [`Shopper`] that must be signed in.
pub struct SignedInShopper(pub Shopper);

impl<S> FromRequestParts<S> for SignedInShopper
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shopper = Shopper::from_request_parts(parts, state).await?;
        if !shopper.ctx.is_authenticated() {
            return Err(AuthRejection::RedirectToLogin(original_path(parts)));
        }
        Ok(Self(shopper))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[test]
    fn test_original_path_keeps_nested_prefix() {
        let mut request = Request::builder()
            .uri("/cart?step=1")
            .body(())
            .unwrap();
        request
            .extensions_mut()
            .insert(OriginalUri("/checkout/cart?step=1".parse().unwrap()));
        let (parts, ()) = request.into_parts();
        assert_eq!(original_path(&parts), "/checkout/cart?step=1");

        let (parts, ()) = Request::builder()
            .uri("/books/p1")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(original_path(&parts), "/books/p1");
    }

    #[test]
    fn test_login_redirect_url() {
        assert_eq!(login_redirect_url("/"), "/auth/login");
        assert_eq!(
            login_redirect_url("/books/p1?x=1"),
            "/auth/login?redirect=%2Fbooks%2Fp1%3Fx%3D1"
        );
    }

    #[test]
    fn test_safe_redirect_target() {
        assert_eq!(safe_redirect_target(Some("/checkout/cart")), "/checkout/cart");
        assert_eq!(safe_redirect_target(Some("//evil.example")), "/");
        assert_eq!(safe_redirect_target(Some("https://evil.example")), "/");
        assert_eq!(safe_redirect_target(None), "/");
    }
}
