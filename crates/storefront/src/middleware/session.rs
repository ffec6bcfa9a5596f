//! Session middleware configuration.
//!
//! Sessions live in process memory in a `moka` cache; the cookie only
//! carries the signed session id. Each record is evicted once its expiry
//! date passes, so abandoned sessions do not accumulate. The signing key is
//! the configured session secret.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry as CacheExpiry;
use moka::future::Cache;
use secrecy::ExposeSecret;
use thiserror::Error;
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::cookie::{Key, SameSite};
use tower_sessions::service::SignedCookie;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "kw_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Upper bound on live sessions held in memory.
const MAX_SESSIONS: u64 = 100_000;

/// The session secret could not be turned into a signing key.
#[derive(Debug, Error)]
#[error("invalid session signing key: {0}")]
pub struct SessionKeyError(String);

/// The configured session layer type.
pub type StorefrontSessionLayer = SessionManagerLayer<CachedSessionStore, SignedCookie>;

/// Evicts each record at its own expiry date.
struct RecordExpiry;

impl RecordExpiry {
    fn remaining(record: &Record) -> Duration {
        Duration::try_from(record.expiry_date - OffsetDateTime::now_utc()).unwrap_or(Duration::ZERO)
    }
}

impl CacheExpiry<Id, Record> for RecordExpiry {
    fn expire_after_create(&self, _id: &Id, record: &Record, _created_at: Instant) -> Option<Duration> {
        Some(Self::remaining(record))
    }

    fn expire_after_update(
        &self,
        _id: &Id,
        record: &Record,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(Self::remaining(record))
    }
}

/// In-memory session store backed by a `moka` cache.
#[derive(Clone)]
pub struct CachedSessionStore {
    cache: Cache<Id, Record>,
}

impl CachedSessionStore {
    #[must_use]
    pub fn new(max_sessions: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_sessions)
                .expire_after(RecordExpiry)
                .build(),
        }
    }
}

impl Default for CachedSessionStore {
    fn default() -> Self {
        Self::new(MAX_SESSIONS)
    }
}

impl fmt::Debug for CachedSessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSessionStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl SessionStore for CachedSessionStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.cache.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.save(record).await
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.cache.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .cache
            .get(id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.cache.invalidate(id).await;
        Ok(())
    }
}

/// Create the session layer with an in-memory store and signed cookies.
///
/// # Errors
///
/// Returns an error if the session secret is too short to sign cookies.
pub fn create_session_layer(
    config: &StorefrontConfig,
) -> Result<StorefrontSessionLayer, SessionKeyError> {
    let key = Key::try_from(config.session_secret.expose_secret().as_bytes())
        .map_err(|e| SessionKeyError(e.to_string()))?;

    Ok(SessionManagerLayer::new(CachedSessionStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::Duration as CookieDuration;

    use super::*;
    use crate::config::tests::test_config;

    fn record(expires_in: CookieDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::new(),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[test]
    fn test_layer_from_valid_secret() {
        assert!(create_session_layer(&test_config()).is_ok());
    }

    #[test]
    fn test_short_secret_is_rejected() {
        let mut config = test_config();
        config.session_secret = "too-short".to_string().into();
        assert!(create_session_layer(&config).is_err());
    }

    #[tokio::test]
    async fn test_store_round_trip_and_delete() {
        let store = CachedSessionStore::default();
        let mut live = record(CookieDuration::hours(1));
        store.create(&mut live).await.unwrap();

        let loaded = store.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, live.id);
        assert_eq!(loaded.expiry_date, live.expiry_date);

        store.delete(&live.id).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_evicted() {
        let store = CachedSessionStore::default();
        let stale = record(CookieDuration::seconds(-5));
        store.save(&stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());
        store.cache.run_pending_tasks().await;
        assert_eq!(store.cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_create_avoids_id_collisions() {
        let store = CachedSessionStore::default();
        let existing = record(CookieDuration::hours(1));
        store.save(&existing).await.unwrap();

        let mut fresh = record(CookieDuration::hours(1));
        fresh.id = existing.id;
        store.create(&mut fresh).await.unwrap();

        assert_ne!(fresh.id, existing.id);
        assert!(store.load(&existing.id).await.unwrap().is_some());
        assert!(store.load(&fresh.id).await.unwrap().is_some());
    }
}
