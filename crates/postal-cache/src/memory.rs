//! In-memory cache implementation.

use async_trait::async_trait;
use postal_core::{CacheKey, LookupCache, NormalizedResult, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Default time-to-live for cached lookups.
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Cache entry with an absolute expiry.
///
/// `expires_at` is `None` when the TTL reaches past the range of
/// [`Instant`]; such entries never expire.
#[derive(Debug, Clone)]
struct CacheEntry {
    data: NormalizedResult,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: NormalizedResult, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// TTL-bounded in-memory cache.
///
/// Entries live in a `RwLock`-protected `HashMap` and are lost when the cache
/// is dropped. There is no capacity bound: entries only leave through expiry
/// or [`clear`](LookupCache::clear).
#[derive(Debug)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl InMemoryCache {
    /// Create a new empty cache whose entries expire `ttl` after insertion.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

/// Removes `key` if its entry is still expired at `now`. Returns whether
/// anything was removed.
fn remove_if_expired(
    entries: &mut HashMap<CacheKey, CacheEntry>,
    key: &CacheKey,
    now: Instant,
) -> bool {
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
        true
    } else {
        false
    }
}

#[async_trait]
impl LookupCache for InMemoryCache {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &CacheKey) -> Result<Option<NormalizedResult>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired(now) => {
                    debug!("Cache hit");
                    return Ok(Some(entry.data.clone()));
                }
                Some(_) => {}
                None => {
                    debug!("Cache miss");
                    return Ok(None);
                }
            }
        }

        // Expired. Re-check under the write lock, a put may have refreshed it.
        if remove_if_expired(&mut *self.entries.write().await, key, now) {
            debug!("Cache entry expired");
        }
        Ok(None)
    }

    #[instrument(skip(self, value), fields(key = %key, provider = %value.provider))]
    async fn put(&self, key: CacheKey, value: &NormalizedResult) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key, CacheEntry::new(value.clone(), self.ttl));
        debug!(ttl = ?self.ttl, "Cached lookup");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn invalidate_expired(&self) -> Result<usize> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Invalidated {} expired cache entries", removed);
        }

        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    fn ttl(&self) -> Option<Duration> {
        Some(self.ttl)
    }
}
