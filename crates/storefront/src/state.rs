//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{ApiClient, Backend, BackendError};
use crate::config::StorefrontConfig;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the backend and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backend: Arc<dyn Backend>,
}

impl AppState {
    /// Create a new application state around any backend implementation.
    #[must_use]
    pub fn new(config: StorefrontConfig, backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, backend }),
        }
    }

    /// Create application state talking to the configured REST backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, BackendError> {
        let client = ApiClient::new(&config.api)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.inner.backend.as_ref()
    }

    /// Shared handle to the backend, for services that outlive a borrow.
    #[must_use]
    pub fn backend_handle(&self) -> Arc<dyn Backend> {
        Arc::clone(&self.inner.backend)
    }
}
