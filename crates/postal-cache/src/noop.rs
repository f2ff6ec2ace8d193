//! No-op cache implementation.

use async_trait::async_trait;
use postal_core::{CacheKey, LookupCache, NormalizedResult, Result};
use std::time::Duration;
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` always returns `Ok(())`.
/// Selected when caching is disabled with a zero TTL.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LookupCache for NoopCache {
    async fn get(&self, _key: &CacheKey) -> Result<Option<NormalizedResult>> {
        trace!("NoopCache: get called, returning None");
        Ok(None)
    }

    async fn put(&self, _key: CacheKey, _value: &NormalizedResult) -> Result<()> {
        trace!("NoopCache: put called, doing nothing");
        Ok(())
    }

    async fn invalidate_expired(&self) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> usize {
        0
    }

    fn ttl(&self) -> Option<Duration> {
        None
    }
}
