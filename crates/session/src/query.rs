//! Cached "current user" query.
//!
//! One entry under a constant key. The route guard reads through it; the
//! session store invalidates it on every auth event and transition.
//!
//! Each invalidation bumps a generation counter. A fetch that started under an
//! older generation still stores its result (so readers see *something*), but
//! only as `Stale`, which forces the next `get()` to fetch again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{IdentityProvider, Session, SessionResolutionError};

pub const CURRENT_USER_KEY: &str = "current-user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Stale,
    Fresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedUserEntry {
    pub value: Session,
    pub freshness: Freshness,
}

pub struct UserQuery {
    provider: Arc<dyn IdentityProvider>,
    entry: Mutex<Option<CachedUserEntry>>,
    generation: AtomicU64,
    fetches: AtomicU64,
    // serialises fetches so concurrent readers share one round trip
    in_flight: tokio::sync::Mutex<()>,
}

impl UserQuery {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            entry: Mutex::new(None),
            generation: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key(&self) -> &'static str {
        CURRENT_USER_KEY
    }

    /// The cached session if it is fresh, otherwise a new resolution.
    pub async fn get(&self) -> Result<Session, SessionResolutionError> {
        if let Some(session) = self.fresh() {
            return Ok(session);
        }

        let _guard = self.in_flight.lock().await;
        // another reader may have refreshed it while we waited
        if let Some(session) = self.fresh() {
            return Ok(session);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        self.fetches.fetch_add(1, Ordering::SeqCst);
        debug!(key = CURRENT_USER_KEY, generation, "fetching current user");

        let user = self.provider.current_user().await.map_err(|err| {
            warn!(key = CURRENT_USER_KEY, error = %err, "current user lookup failed");
            SessionResolutionError::from(err)
        })?;
        let session = Session::from_user(user);

        let freshness = if self.generation.load(Ordering::SeqCst) == generation {
            Freshness::Fresh
        } else {
            debug!(key = CURRENT_USER_KEY, "invalidated during fetch; storing as stale");
            Freshness::Stale
        };
        *self.entry.lock() = Some(CachedUserEntry {
            value: session.clone(),
            freshness,
        });
        Ok(session)
    }

    /// Mark the entry stale. In-flight fetches will not store a fresh result.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(entry) = self.entry.lock().as_mut() {
            entry.freshness = Freshness::Stale;
        }
    }

    /// Current entry without fetching.
    pub fn peek(&self) -> Option<CachedUserEntry> {
        self.entry.lock().clone()
    }

    /// Number of provider lookups performed so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }

    fn fresh(&self) -> Option<Session> {
        match self.entry.lock().as_ref() {
            Some(entry) if entry.freshness == Freshness::Fresh => Some(entry.value.clone()),
            _ => None,
        }
    }
}

impl std::fmt::Debug for UserQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserQuery")
            .field("entry", &*self.entry.lock())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryIdentityProvider;
    use crate::IdentityProvider;

    fn setup() -> (Arc<MemoryIdentityProvider>, UserQuery) {
        let provider = Arc::new(MemoryIdentityProvider::new().with_account("a@b.co", "secret"));
        let query = UserQuery::new(provider.clone());
        (provider, query)
    }

    #[tokio::test]
    async fn fresh_entry_is_served_from_cache() {
        let (_, query) = setup();
        assert_eq!(query.get().await.unwrap(), Session::Anonymous);
        assert_eq!(query.get().await.unwrap(), Session::Anonymous);
        assert_eq!(query.fetch_count(), 1);
        assert_eq!(query.peek().unwrap().freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (provider, query) = setup();
        query.get().await.unwrap();
        provider.sign_in_with_password("a@b.co", "secret").await.unwrap();

        // still the cached value until invalidated
        assert_eq!(query.get().await.unwrap(), Session::Anonymous);

        query.invalidate();
        assert_eq!(query.peek().unwrap().freshness, Freshness::Stale);
        assert!(query.get().await.unwrap().is_authenticated());
        assert_eq!(query.fetch_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_on_empty_cache_is_harmless() {
        let (_, query) = setup();
        query.invalidate();
        assert!(query.peek().is_none());
        assert_eq!(query.get().await.unwrap(), Session::Anonymous);
    }

    #[tokio::test]
    async fn fetch_started_before_invalidation_is_stored_stale() {
        let (provider, query) = setup();
        let query = Arc::new(query);
        let gate = provider.hold_current_user();

        let reader = {
            let query = query.clone();
            tokio::spawn(async move { query.get().await })
        };
        gate.wait_entered().await;
        query.invalidate();
        gate.release();

        assert_eq!(reader.await.unwrap().unwrap(), Session::Anonymous);
        assert_eq!(query.peek().unwrap().freshness, Freshness::Stale);

        query.get().await.unwrap();
        assert_eq!(query.fetch_count(), 2);
        assert_eq!(query.peek().unwrap().freshness, Freshness::Fresh);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (provider, query) = setup();
        provider.set_offline(true);
        assert!(query.get().await.is_err());
        assert!(query.peek().is_none());
        provider.set_offline(false);
        assert_eq!(query.get().await.unwrap(), Session::Anonymous);
    }

    #[test]
    fn key_is_constant() {
        let (_, query) = setup();
        assert_eq!(query.key(), "current-user");
    }
}
