//! Cache-then-chain composition behind the HTTP gateway.

use std::fmt;
use std::sync::Arc;

use postal_core::{CacheKey, CountryCode, LookupCache, LookupRequest, NormalizedResult, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::chain::{ProviderChain, Resolution};
use crate::registry::ProviderRegistry;
use crate::settings::{ProviderOrder, ProviderSettings};

/// A postal lookup answer and where it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lookup {
    /// True if served from the cache without calling any provider.
    pub from_cache: bool,
    /// The normalized result.
    pub data: NormalizedResult,
}

/// Postal lookups with caching, and uncached free-text search.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use postal::{CountryCode, InMemoryCache, PostalService, ProviderSettings};
///
/// let settings = ProviderSettings::default().with_credential("GEONAMES_USERNAME", "demo");
/// let service = PostalService::from_settings(&settings, Arc::new(InMemoryCache::default()));
///
/// let lookup = service.postal(&CountryCode::new("us"), "94103").await?;
/// ```
#[derive(Clone)]
pub struct PostalService {
    chain: ProviderChain,
    cache: Arc<dyn LookupCache>,
    order: ProviderOrder,
}

impl fmt::Debug for PostalService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostalService")
            .field("chain", &self.chain)
            .field("cache", &self.cache.ttl().map_or("disabled", |_| "configured"))
            .field("order", &self.order)
            .finish()
    }
}

impl PostalService {
    /// Creates a service from an already built chain.
    #[must_use]
    pub fn new(chain: ProviderChain, cache: Arc<dyn LookupCache>, order: ProviderOrder) -> Self {
        Self {
            chain,
            cache,
            order,
        }
    }

    /// Builds the registry, chain and order from `settings`.
    #[must_use]
    pub fn from_settings(settings: &ProviderSettings, cache: Arc<dyn LookupCache>) -> Self {
        let registry = Arc::new(ProviderRegistry::from_settings(settings));
        let chain = ProviderChain::new(registry).with_deadline(settings.chain_deadline);
        Self::new(chain, cache, settings.order.clone())
    }

    /// Identifiers of every registered provider, in catalog order.
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        self.chain.registry().list()
    }

    /// The configured fallback order.
    #[must_use]
    pub const fn order(&self) -> &ProviderOrder {
        &self.order
    }

    /// The cache backing postal lookups.
    #[must_use]
    pub const fn cache(&self) -> &Arc<dyn LookupCache> {
        &self.cache
    }

    /// Looks up a postal code.
    ///
    /// A cache hit is returned without calling any provider. On a miss the
    /// chain is walked and a found result is cached. `Ok(None)` means no
    /// provider had data.
    ///
    /// # Errors
    ///
    /// Returns an error only if the cache backend fails on read.
    pub async fn postal(&self, country: &CountryCode, code: &str) -> Result<Option<Lookup>> {
        let key = CacheKey::postal(country, code);

        if let Some(data) = self.cache.get(&key).await? {
            debug!(key = %key, "Cache hit for postal lookup");
            return Ok(Some(Lookup {
                from_cache: true,
                data,
            }));
        }

        let request = LookupRequest::postal(country.clone(), code);
        let Some(data) = self.resolve(&request).await.result else {
            return Ok(None);
        };

        if let Err(e) = self.cache.put(key, &data).await {
            warn!(error = %e, "Failed to cache postal lookup");
        }

        Ok(Some(Lookup {
            from_cache: false,
            data,
        }))
    }

    /// Runs a free-text search. Results are never cached.
    pub async fn search(&self, country: &CountryCode, query: &str) -> Option<NormalizedResult> {
        let request = LookupRequest::search(country.clone(), query);
        self.resolve(&request).await.result
    }

    async fn resolve(&self, request: &LookupRequest) -> Resolution {
        let resolution = self.chain.resolve(request, &self.order).await;
        if resolution.result.is_none() {
            debug!(
                request = %request,
                attempts = ?resolution.attempts,
                "No provider returned data"
            );
        }
        resolution
    }
}
