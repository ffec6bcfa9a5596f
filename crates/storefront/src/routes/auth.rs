//! Authentication route handlers.
//!
//! Login, registration, email verification and password reset against the
//! KitabWale backend. A successful sign-in initializes the visitor's store
//! context; logout tears it down.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use kitabwale_core::validation::RegistrationInput;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, redirect_error, redirect_success, save_then};
use crate::backend::BackendError;
use crate::filters;
use crate::middleware::auth::safe_redirect_target;
use crate::middleware::{CspNonce, Shopper};
use crate::notice::{MessageQuery, backend_code, validation_code};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub redirect: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Checkbox: present only when ticked.
    pub agree_terms: Option<String>,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// Login page query: notices plus where to go afterwards.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub redirect: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub redirect: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub layout: Layout,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub layout: Layout,
    pub token: String,
}

/// Notice code for an account operation failure.
fn auth_error_code(err: &AuthError, fallback: &'static str) -> &'static str {
    match err {
        AuthError::Validation(e) => validation_code(e),
        AuthError::Backend(e) => backend_code(e, fallback),
        AuthError::Session(_) => "session",
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Display the login page.
pub async fn login_page(
    shopper: Shopper,
    Query(query): Query<LoginQuery>,
    nonce: CspNonce,
) -> Response {
    if shopper.ctx.is_authenticated() {
        return Redirect::to(safe_redirect_target(query.redirect.as_deref())).into_response();
    }
    let messages = MessageQuery {
        error: query.error,
        success: query.success,
    };
    LoginTemplate {
        layout: Layout::new(&shopper.ctx, &messages, nonce),
        redirect: safe_redirect_target(query.redirect.as_deref()).to_string(),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, shopper, form))]
pub async fn login(
    State(state): State<AppState>,
    mut shopper: Shopper,
    Form(form): Form<LoginForm>,
) -> Response {
    let target = safe_redirect_target(form.redirect.as_deref()).to_string();
    match AuthService::new(state.backend())
        .login(&mut shopper.ctx, &form.email, &form.password)
        .await
    {
        Ok(()) => {
            // New identity, new session id.
            if let Err(e) = shopper.session().cycle_id().await {
                tracing::error!("Failed to cycle session id: {e}");
                return redirect_error("/auth/login", "session");
            }
            save_then(&shopper, Redirect::to(&target).into_response()).await
        }
        Err(e) => {
            tracing::warn!(error = %e, "Login failed");
            let code = match &e {
                AuthError::Backend(BackendError::Unauthorized(_) | BackendError::Rejected { .. })
                | AuthError::Validation(_) => "credentials",
                other => auth_error_code(other, "credentials"),
            };
            let path = format!("/auth/login?redirect={}", urlencoding::encode(&target));
            redirect_error(&path, code)
        }
    }
}

/// Log out.
#[instrument(skip(state, shopper))]
pub async fn logout(State(state): State<AppState>, mut shopper: Shopper) -> Response {
    let (ctx, session) = shopper.parts_mut();
    let session = session.clone();
    if let Err(e) = AuthService::new(state.backend()).logout(ctx, &session).await {
        tracing::error!(error = %e, "Logout failed");
    }
    redirect_success("/", "logged_out")
}

// =============================================================================
// Registration & Verification
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    RegisterTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
    }
}

/// Handle registration form submission.
///
/// The backend sends a verification email; the user is not signed in.
#[instrument(skip(state, form))]
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    let input = RegistrationInput {
        name: form.name,
        email: form.email,
        password: form.password,
        agree_terms: form.agree_terms.is_some(),
    };

    match AuthService::new(state.backend()).register(&input).await {
        Ok(_) => redirect_success("/auth/login", "registered"),
        Err(e) => {
            tracing::warn!(error = %e, "Registration failed");
            redirect_error("/auth/register", auth_error_code(&e, "register_failed"))
        }
    }
}

/// Verify an email address from the link in the verification email.
#[instrument(skip(state, shopper, token))]
pub async fn verify_email(
    State(state): State<AppState>,
    mut shopper: Shopper,
    Path(token): Path<String>,
) -> Response {
    match AuthService::new(state.backend())
        .verify_email(&mut shopper.ctx, &token)
        .await
    {
        Ok(true) => save_then(&shopper, redirect_success("/", "verified")).await,
        Ok(false) => redirect_success("/auth/login", "verified"),
        Err(e) => {
            tracing::warn!(error = %e, "Email verification failed");
            redirect_error("/auth/login", auth_error_code(&e, "verify_failed"))
        }
    }
}

// =============================================================================
// Password Reset
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(
    shopper: Shopper,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    ForgotPasswordTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
    }
}

/// Request a reset email.
///
/// The same notice is shown whether or not the address is registered.
#[instrument(skip(state, form))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    match AuthService::new(state.backend())
        .forgot_password(&form.email)
        .await
    {
        Ok(_) | Err(AuthError::Backend(BackendError::NotFound(_) | BackendError::Rejected { .. })) => {
            redirect_success("/auth/forgot-password", "reset_sent")
        }
        Err(e) => {
            tracing::warn!(error = %e, "Forgot password failed");
            redirect_error("/auth/forgot-password", auth_error_code(&e, "request_failed"))
        }
    }
}

/// Display the reset password page.
pub async fn reset_password_page(
    shopper: Shopper,
    Path(token): Path<String>,
    Query(query): Query<MessageQuery>,
    nonce: CspNonce,
) -> impl IntoResponse {
    ResetPasswordTemplate {
        layout: Layout::new(&shopper.ctx, &query, nonce),
        token,
    }
}

/// Set a new password.
#[instrument(skip(state, token, form))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    match AuthService::new(state.backend())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(_) => redirect_success("/auth/login", "password_reset"),
        Err(e) => {
            tracing::warn!(error = %e, "Password reset failed");
            let path = format!("/auth/reset-password/{}", urlencoding::encode(&token));
            redirect_error(&path, auth_error_code(&e, "reset_failed"))
        }
    }
}
