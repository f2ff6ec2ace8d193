#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/postalia/postalia/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP gateway in front of [`postal::PostalService`].

use std::fmt;
use std::sync::Arc;

use postal::{InMemoryCache, LookupCache, NoopCache, PostalService, spawn_sweeper};
use tokio::task::JoinHandle;
use tracing::info;

/// Startup configuration.
pub mod config;
/// Error types and JSON error responses.
pub mod error;
/// Tracing subscriber setup.
pub mod logging;
/// Per-client rate limiting.
pub mod rate_limit;
/// HTTP routes.
pub mod routes;

pub use config::Settings;
pub use error::{ConfigError, ServerError};
pub use routes::{AppState, router};

/// Cache selected by the settings, with its sweep task if one was started.
pub struct CacheHandle {
    /// The cache.
    pub cache: Arc<dyn LookupCache>,
    /// Background expiry sweep, absent when caching is disabled.
    pub sweeper: Option<JoinHandle<()>>,
}

impl fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheHandle")
            .field("ttl", &self.cache.ttl())
            .field("sweeper", &self.sweeper.is_some())
            .finish()
    }
}

/// Builds the cache: [`NoopCache`] for a zero TTL, otherwise an
/// [`InMemoryCache`] swept in the background.
///
/// Must be called from within a tokio runtime.
#[must_use]
pub fn build_cache(settings: &Settings) -> CacheHandle {
    let (Some(ttl), Some(period)) = (settings.cache_ttl(), settings.cache_check_period()) else {
        info!("Response caching disabled");
        return CacheHandle {
            cache: Arc::new(NoopCache::new()),
            sweeper: None,
        };
    };

    let cache = Arc::new(InMemoryCache::new(ttl));
    let sweeper = spawn_sweeper(&cache, period);
    info!(ttl = ?ttl, check_period = ?period, "Response caching enabled");

    CacheHandle {
        cache,
        sweeper: Some(sweeper),
    }
}

/// Builds the lookup service from the settings and a cache.
#[must_use]
pub fn build_service(settings: &Settings, cache: Arc<dyn LookupCache>) -> PostalService {
    PostalService::from_settings(&settings.provider_settings(), cache)
}
