//! Per-client rate limiting.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::error::error_response;

/// Keyed limiter shared by every request.
pub type ClientRateLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Bucket for requests whose peer address is unknown.
const SHARED_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Creates a limiter allowing `max` requests per `window` for each client.
#[must_use]
pub fn client_limiter(window: Duration, max: u32) -> Arc<ClientRateLimiter> {
    Arc::new(RateLimiter::keyed(quota_from_window(window, max)))
}

/// Full burst of `max`, replenished evenly over `window`.
fn quota_from_window(window: Duration, max: u32) -> Quota {
    let burst = NonZeroU32::new(max).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

/// Middleware rejecting clients over their quota with HTTP 429.
pub async fn enforce(
    State(limiter): State<Arc<ClientRateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(SHARED_CLIENT, |ConnectInfo(addr)| addr.ip());

    if limiter.check_key(&client).is_err() {
        warn!(client = %client, "Rate limit exceeded");
        return error_response(StatusCode::TOO_MANY_REQUESTS, "too many requests");
    }

    next.run(request).await
}

/// Spawns a task dropping idle client buckets every `period`.
///
/// Stops once the limiter has been dropped.
pub fn spawn_pruner(limiter: &Arc<ClientRateLimiter>, period: Duration) -> JoinHandle<()> {
    let limiter = Arc::downgrade(limiter);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(limiter) = limiter.upgrade() else {
                break;
            };
            limiter.retain_recent();
            limiter.shrink_to_fit();
            debug!(clients = limiter.len(), "Pruned rate-limit buckets");
        }
    })
}
