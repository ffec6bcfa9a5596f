//! Per-visitor store state.
//!
//! Everything the storefront remembers about a shopper between requests
//! lives in one [`StoreContext`]: who they are, the backend credential to
//! replay, the cart and wishlist mirrors, and checkout progress. It is
//! loaded from the session at the start of a request, handed to services
//! by `&mut`, and saved back before the response goes out.

use kitabwale_core::checkout::CheckoutState;
use kitabwale_core::mirror::{CartStore, WishlistStore};
use tower_sessions::Session;
use tracing::instrument;

use crate::backend::{Authenticated, Backend, BackendError, Credential};
use crate::models::{CurrentUser, session_keys};

/// Session-scoped store for one visitor.
#[derive(Debug, Clone, Default)]
pub struct StoreContext {
    user: Option<CurrentUser>,
    credential: Option<Credential>,
    pub cart: CartStore,
    pub wishlist: WishlistStore,
    pub checkout: CheckoutState,
}

impl StoreContext {
    /// An empty context for a signed-out visitor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.credential.is_some()
    }

    /// The logged-in user and their credential.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for signed-out visitors.
    pub fn session(&self) -> Result<(&CurrentUser, &Credential), BackendError> {
        match (&self.user, &self.credential) {
            (Some(user), Some(credential)) => Ok((user, credential)),
            _ => Err(BackendError::Unauthorized("not logged in".to_string())),
        }
    }

    /// The backend credential, cloned so callers can keep mutating `self`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] for signed-out visitors.
    pub fn credential(&self) -> Result<Credential, BackendError> {
        self.session().map(|(_, credential)| credential.clone())
    }

    /// Replace the cached user after a profile update.
    pub fn set_user(&mut self, user: CurrentUser) {
        self.user = Some(user);
    }

    /// Start a signed-in context and pull the cart and wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if either collection cannot be fetched.
    #[instrument(skip(self, backend, auth), fields(user_id = %auth.user.id))]
    pub async fn initialize(
        &mut self,
        backend: &dyn Backend,
        auth: Authenticated,
    ) -> Result<(), BackendError> {
        *self = Self {
            user: Some(CurrentUser::from(auth.user)),
            credential: Some(auth.credential),
            ..Self::default()
        };
        self.refresh_cart(backend).await?;
        self.refresh_wishlist(backend).await
    }

    /// Re-read the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart cannot be fetched.
    pub async fn refresh_cart(&mut self, backend: &dyn Backend) -> Result<(), BackendError> {
        let (user, credential) = self.session()?;
        let cart = backend.cart(credential, &user.id).await?;
        self.cart.replace(cart);
        Ok(())
    }

    /// Re-read the wishlist from the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the wishlist cannot be fetched.
    pub async fn refresh_wishlist(&mut self, backend: &dyn Backend) -> Result<(), BackendError> {
        let (user, credential) = self.session()?;
        let wishlist = backend.wishlist(credential, &user.id).await?;
        self.wishlist.replace(wishlist);
        Ok(())
    }

    /// Load the context stored in `session`, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: &Session) -> Result<Self, tower_sessions::session::Error> {
        Ok(Self {
            user: session.get(session_keys::CURRENT_USER).await?,
            credential: session.get(session_keys::CREDENTIAL).await?,
            cart: session.get(session_keys::CART).await?.unwrap_or_default(),
            wishlist: session
                .get(session_keys::WISHLIST)
                .await?
                .unwrap_or_default(),
            checkout: session
                .get(session_keys::CHECKOUT)
                .await?
                .unwrap_or_default(),
        })
    }

    /// Write the context back to `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        match (&self.user, &self.credential) {
            (Some(user), Some(credential)) => {
                session.insert(session_keys::CURRENT_USER, user).await?;
                session.insert(session_keys::CREDENTIAL, credential).await?;
            }
            _ => {
                session
                    .remove::<CurrentUser>(session_keys::CURRENT_USER)
                    .await?;
                session
                    .remove::<Credential>(session_keys::CREDENTIAL)
                    .await?;
            }
        }
        session.insert(session_keys::CART, &self.cart).await?;
        session.insert(session_keys::WISHLIST, &self.wishlist).await?;
        session.insert(session_keys::CHECKOUT, &self.checkout).await
    }

    /// Forget everything and destroy the session (logout).
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be flushed.
    pub async fn teardown(&mut self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        *self = Self::default();
        session.flush().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use kitabwale_core::UserId;
    use kitabwale_core::models::User;

    fn authenticated() -> Authenticated {
        Authenticated {
            user: User {
                id: UserId::new("u1"),
                name: "Asha".to_string(),
                email: "asha@example.com".to_string(),
                phone_number: None,
                is_verified: true,
            },
            credential: Credential::new("access_token=abc"),
        }
    }

    #[test]
    fn test_signed_out_context_has_no_credential() {
        let ctx = StoreContext::new();
        assert!(!ctx.is_authenticated());
        assert!(matches!(
            ctx.credential(),
            Err(BackendError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_session_returns_user_and_credential() {
        let auth = authenticated();
        let ctx = StoreContext {
            user: Some(CurrentUser::from(auth.user)),
            credential: Some(auth.credential),
            ..StoreContext::default()
        };
        let (user, credential) = ctx.session().unwrap();
        assert_eq!(user.id, UserId::new("u1"));
        assert_eq!(credential.cookie_header(), "access_token=abc");
    }
}
