//! Periodic expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use postal_core::LookupCache;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Fraction of the TTL used as the default sweep interval.
const CHECK_PERIOD_RATIO: f64 = 0.2;

/// Longest sweep interval; longer periods are clamped to it.
const MAX_CHECK_PERIOD: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Returns the default sweep interval for a TTL: a fifth of it, rounded to
/// whole seconds, never below one second.
#[must_use]
pub fn default_check_period(ttl: Duration) -> Duration {
    let seconds = (ttl.as_secs_f64() * CHECK_PERIOD_RATIO).round().max(1.0);
    Duration::from_secs_f64(seconds)
}

/// Spawns a task that calls [`LookupCache::invalidate_expired`] every `period`.
///
/// `period` is capped at one year. The task holds only a weak reference and
/// exits on the first tick after the cache has been dropped. Must be called
/// from within a tokio runtime.
pub fn spawn_sweeper<C>(cache: &Arc<C>, period: Duration) -> JoinHandle<()>
where
    C: LookupCache + ?Sized + 'static,
{
    let cache = Arc::downgrade(cache);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.min(MAX_CHECK_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(cache) = cache.upgrade() else {
                debug!("Cache dropped, stopping expiry sweep");
                break;
            };

            match cache.invalidate_expired().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "Swept expired cache entries"),
                Err(e) => warn!(error = %e, "Cache sweep failed"),
            }
        }
    })
}
