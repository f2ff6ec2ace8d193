//! Cache trait for storing successful lookups.
//!
//! This module defines the [`LookupCache`] trait and the [`CacheKey`] it is
//! keyed by. Keys are namespaced by [`LookupKind`] so a postal lookup and a
//! search with the same literal text never share an entry.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::{
    error::Result,
    request::{LookupKind, LookupRequest},
    types::{CountryCode, NormalizedResult},
};

/// Separator between the components of a [`CacheKey`].
pub const KEY_SEPARATOR: char = ':';

/// Composite cache key: `<kind>:<COUNTRY>:<code>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds a key from its components. The country is uppercased and the
    /// term kept verbatim.
    #[must_use]
    pub fn new(kind: LookupKind, country: &CountryCode, term: &str) -> Self {
        Self(format!(
            "{kind}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{term}",
            country.as_str().to_uppercase()
        ))
    }

    /// Key for a postal-code lookup.
    #[must_use]
    pub fn postal(country: &CountryCode, code: &str) -> Self {
        Self::new(LookupKind::Postal, country, code)
    }

    /// Key for a free-text search.
    #[must_use]
    pub fn search(country: &CountryCode, query: &str) -> Self {
        Self::new(LookupKind::Search, country, query)
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&LookupRequest> for CacheKey {
    fn from(request: &LookupRequest) -> Self {
        Self::new(request.kind, &request.country, &request.term)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for caching successful lookups.
///
/// Implementations apply a fixed time-to-live at insertion and must never
/// return an entry past its expiry. Only found results are ever stored;
/// callers never write "not found".
#[async_trait]
pub trait LookupCache: Send + Sync {
    /// Retrieves a cached result.
    ///
    /// Returns `Ok(Some(result))` if a live entry exists, `Ok(None)` otherwise.
    async fn get(&self, key: &CacheKey) -> Result<Option<NormalizedResult>>;

    /// Stores a result under `key` with the cache's TTL.
    async fn put(&self, key: CacheKey, value: &NormalizedResult) -> Result<()>;

    /// Removes every expired entry.
    ///
    /// Returns the number of entries removed.
    async fn invalidate_expired(&self) -> Result<usize>;

    /// Clears all cached data.
    async fn clear(&self) -> Result<()>;

    /// Returns the number of stored entries, including expired ones not yet swept.
    async fn len(&self) -> usize;

    /// Returns true if nothing is stored.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the time-to-live applied to new entries, or `None` if the
    /// cache does not store anything.
    fn ttl(&self) -> Option<Duration>;
}
