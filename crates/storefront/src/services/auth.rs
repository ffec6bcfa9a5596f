//! Account service.
//!
//! Wraps the backend's auth endpoints and keeps the visitor's
//! [`StoreContext`] in step: initialized on login or verified sign-in,
//! torn down on logout.

use kitabwale_core::validation::{
    RegistrationInput, ValidationError, validate_login, validate_new_password, validate_profile,
};
use kitabwale_core::Email;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use super::StoreContext;
use crate::backend::{Authenticated, Backend, BackendError, ProfileUpdate, RegisterRequest};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::CurrentUser;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Form input rejected before reaching the backend.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Backend call failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// Account service.
pub struct AuthService<'a> {
    backend: &'a dyn Backend,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(backend: &'a dyn Backend) -> Self {
        Self { backend }
    }

    /// Register a new account. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the backend's rejection.
    #[instrument(skip(self, input))]
    pub async fn register(&self, input: &RegistrationInput) -> Result<String, AuthError> {
        let valid = input.validate()?;
        let request = RegisterRequest {
            name: valid.name,
            email: valid.email.into_inner(),
            password: valid.password,
            agree_terms: true,
        };
        Ok(self.backend.register(&request).await?)
    }

    /// Log in and initialize the store context.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the backend's rejection.
    #[instrument(skip(self, ctx, password))]
    pub async fn login(
        &self,
        ctx: &mut StoreContext,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let email = validate_login(email, password)?;
        let auth = self.backend.login(&email, password).await?;
        self.start(ctx, auth).await;
        Ok(())
    }

    /// Verify an email address. When the backend also signs the user in,
    /// the store context is initialized and `true` is returned.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection of the token.
    #[instrument(skip(self, ctx, token))]
    pub async fn verify_email(
        &self,
        ctx: &mut StoreContext,
        token: &str,
    ) -> Result<bool, AuthError> {
        let Some(credential) = self.backend.verify_email(token).await? else {
            return Ok(false);
        };
        let user = self.backend.verify_auth(&credential).await?;
        self.start(ctx, Authenticated { user, credential }).await;
        Ok(true)
    }

    /// Request a password-reset email.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the backend's rejection.
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        let email = Email::parse(email.trim()).map_err(ValidationError::from)?;
        Ok(self.backend.forgot_password(&email).await?)
    }

    /// Set a new password from a reset link.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the backend's rejection.
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        confirm: &str,
    ) -> Result<String, AuthError> {
        let password = validate_new_password(password, confirm)?;
        Ok(self.backend.reset_password(token, &password).await?)
    }

    /// Re-check the stored credential with the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if it is no longer valid.
    pub async fn verify_session(&self, ctx: &mut StoreContext) -> Result<(), AuthError> {
        let credential = ctx.credential()?;
        let user = self.backend.verify_auth(&credential).await?;
        ctx.set_user(CurrentUser::from(user));
        Ok(())
    }

    /// Update name and phone number.
    ///
    /// # Errors
    ///
    /// Returns a validation error or the backend's rejection.
    #[instrument(skip(self, ctx, name, phone_number))]
    pub async fn update_profile(
        &self,
        ctx: &mut StoreContext,
        name: &str,
        phone_number: &str,
    ) -> Result<(), AuthError> {
        let (name, phone_number) = validate_profile(name, phone_number)?;
        let (user, credential) = ctx.session()?;
        let user = self
            .backend
            .update_profile(credential, &user.id, &ProfileUpdate { name, phone_number })
            .await?;
        ctx.set_user(CurrentUser::from(user));
        Ok(())
    }

    /// Log out: tell the backend, then forget the session.
    ///
    /// A backend failure is logged; the local session is cleared regardless.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be flushed.
    #[instrument(skip(self, ctx, session))]
    pub async fn logout(&self, ctx: &mut StoreContext, session: &Session) -> Result<(), AuthError> {
        if let Ok(credential) = ctx.credential()
            && let Err(e) = self.backend.logout(&credential).await
        {
            tracing::warn!(error = %e, "Backend logout failed");
        }
        ctx.teardown(session).await?;
        clear_sentry_user();
        Ok(())
    }

    async fn start(&self, ctx: &mut StoreContext, auth: Authenticated) {
        set_sentry_user(&auth.user.id, Some(&auth.user.email));
        tracing::info!(user_id = %auth.user.id, "User signed in");
        if let Err(e) = ctx.initialize(self.backend, auth).await {
            tracing::warn!(error = %e, "Could not load cart and wishlist after sign-in");
        }
    }
}
