//! `postalia`: HTTP gateway for postal-code lookups.

use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use postal_server::rate_limit::{client_limiter, spawn_pruner};
use postal_server::{AppState, Settings, build_cache, build_service, logging, router};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let settings = Settings::load().context("failed to load configuration")?;
    info!(settings = ?settings, "Configuration loaded");

    let cache = build_cache(&settings);
    let service = build_service(&settings, cache.cache.clone());
    info!(
        providers = ?service.providers(),
        order = %service.order(),
        "Provider registry ready"
    );

    let limiter = client_limiter(settings.rate_limit_window(), settings.rate_limit_max);
    let pruner = spawn_pruner(&limiter, settings.rate_limit_window());
    let app = router(AppState::new(service), limiter);

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    info!(addr = %addr, "postalia listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    pruner.abort();
    if let Some(sweeper) = cache.sweeper {
        sweeper.abort();
    }
    info!("postalia stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
