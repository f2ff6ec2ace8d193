//! HTTP routes.

use std::any::Any;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use chrono::Utc;
use postal::{CountryCode, PostalService};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::{ServerError, error_response};
use crate::rate_limit::{self, ClientRateLimiter};

/// State shared by every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Lookup service.
    pub service: Arc<PostalService>,
}

impl AppState {
    /// Wraps a service.
    #[must_use]
    pub fn new(service: PostalService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// Builds the gateway router with its middleware stack.
pub fn router(state: AppState, limiter: Arc<ClientRateLimiter>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/providers", get(providers))
        .route("/v1/postal/{country}/{code}", get(postal))
        .route("/v1/search", get(search))
        .layer(middleware::from_fn_with_state(limiter, rate_limit::enforce))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CatchPanicLayer::custom(panic_response))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true, "ts": Utc::now().timestamp_millis() }))
}

async fn providers(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "providers": state.service.providers() }))
}

async fn postal(
    State(state): State<AppState>,
    Path((country, code)): Path<(String, String)>,
) -> Result<Response, ServerError> {
    let country = CountryCode::new(country);
    match state.service.postal(&country, &code).await? {
        Some(lookup) => Ok(Json(lookup).into_response()),
        None => Ok(error_response(StatusCode::NOT_FOUND, "not found")),
    }
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    country: Option<String>,
    q: Option<String>,
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let country = params.country.filter(|country| !country.is_empty());
    let query = params.q.filter(|q| !q.is_empty());
    let (Some(country), Some(query)) = (country, query) else {
        return error_response(StatusCode::BAD_REQUEST, "missing required parameters");
    };

    let data = state
        .service
        .search(&CountryCode::new(country), &query)
        .await;
    Json(json!({ "data": data })).into_response()
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    };
    ServerError::Panic(details).into_response()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::SocketAddr;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::extract::ConnectInfo;
    use axum::http::Request;
    use postal::{
        InMemoryCache, NormalizedResult, PostalFields, PostalProvider, ProviderChain,
        ProviderOrder, ProviderRegistry, ProviderSettings, Result,
    };
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    use super::*;
    use crate::logging::DEFAULT_FILTER;

    /// Log sink shared between the subscriber and the test.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[derive(Debug, Default)]
    struct Fixed {
        calls: AtomicUsize,
        panics: bool,
    }

    #[async_trait]
    impl PostalProvider for Fixed {
        fn id(&self) -> &str {
            "fixed"
        }

        fn description(&self) -> &str {
            "fixed answer"
        }

        async fn lookup(&self, country: &CountryCode, code: &str) -> Result<Option<NormalizedResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!self.panics, "provider exploded");
            Ok(Some(NormalizedResult::structured(
                "fixed",
                json!({"postalCode": code, "placeName": "Beverly Hills"}),
                PostalFields::new(country.clone(), code)
                    .with_place_name("Beverly Hills")
                    .with_admin_name1("California")
                    .with_coordinates(34.0901, -118.4065),
            )))
        }
    }

    fn fixed_app(provider: Arc<Fixed>, max: u32) -> Router {
        let registry = ProviderRegistry::new().with_provider("fixed", vec![], provider);
        let service = PostalService::new(
            ProviderChain::new(Arc::new(registry)),
            Arc::new(InMemoryCache::default()),
            ProviderOrder::parse("fixed"),
        );
        router(
            AppState::new(service),
            rate_limit::client_limiter(Duration::from_secs(60), max),
        )
    }

    fn unconfigured_app() -> Router {
        let settings = ProviderSettings::new(ProviderOrder::parse("geonames,openplz"));
        let service = PostalService::from_settings(&settings, Arc::new(InMemoryCache::default()));
        router(
            AppState::new(service),
            rate_limit::client_limiter(Duration::from_secs(60), 200),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok_with_timestamp() {
        let (status, body) = get_json(unconfigured_app(), "/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], json!(true));
        assert!(body["ts"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn providers_lists_catalog() {
        let (status, body) = get_json(unconfigured_app(), "/v1/providers").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["providers"],
            json!(["geonames", "postalcodesapp", "zipcodestack", "zipbase", "zipapi", "openplz"])
        );
    }

    #[tokio::test]
    async fn unconfigured_providers_give_not_found() {
        let (status, body) = get_json(unconfigured_app(), "/v1/postal/DE/10115").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn second_postal_request_is_served_from_cache() {
        let provider = Arc::new(Fixed::default());
        let app = fixed_app(provider.clone(), 200);

        let (status, first) = get_json(app.clone(), "/v1/postal/us/90210").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["fromCache"], json!(false));
        assert_eq!(first["data"]["normalized"]["country"], json!("US"));
        assert_eq!(first["data"]["normalized"]["postalCode"], json!("90210"));
        assert_eq!(first["data"]["normalized"]["adminName1"], json!("California"));

        let (status, second) = get_json(app, "/v1/postal/US/90210").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["fromCache"], json!(true));
        assert_eq!(second["data"], first["data"]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn search_requires_country_and_query() {
        let app = fixed_app(Arc::new(Fixed::default()), 200);

        for uri in ["/v1/search?q=Beverly", "/v1/search?country=US", "/v1/search?country=&q=x"] {
            let (status, body) = get_json(app.clone(), uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body, json!({"error": "missing required parameters"}));
        }
    }

    #[tokio::test]
    async fn search_returns_data_or_null() {
        let provider = Arc::new(Fixed::default());
        let (status, body) = get_json(
            fixed_app(provider.clone(), 200),
            "/v1/search?country=us&q=Beverly%20Hills",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["provider"], json!("fixed"));
        assert_eq!(body["data"]["normalized"]["postalCode"], json!("Beverly Hills"));

        let (status, body) = get_json(unconfigured_app(), "/v1/search?country=DE&q=Berlin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"data": null}));
    }

    #[tokio::test]
    async fn rate_limit_rejects_excess_requests() {
        let app = fixed_app(Arc::new(Fixed::default()), 2);
        let peer: SocketAddr = "203.0.113.7:5000".parse().unwrap();

        let mut statuses = Vec::new();
        for _ in 0..3 {
            let request = Request::builder()
                .uri("/v1/health")
                .extension(ConnectInfo(peer))
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            statuses.push(response.status());
        }

        assert_eq!(
            statuses,
            vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
        );
    }

    #[tokio::test]
    async fn panics_become_internal_errors() {
        let provider = Arc::new(Fixed {
            calls: AtomicUsize::new(0),
            panics: true,
        });
        let (status, body) = get_json(fixed_app(provider, 200), "/v1/postal/US/90210").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], json!("internal error"));
        assert!(body["details"].as_str().unwrap().contains("provider exploded"));
    }

    #[tokio::test]
    async fn requests_are_logged_under_default_filter() {
        let captured = Captured::default();
        let _guard = tracing_subscriber::registry()
            .with(EnvFilter::new(DEFAULT_FILTER))
            .with(
                fmt::layer()
                    .with_writer(captured.clone())
                    .with_ansi(false),
            )
            .set_default();

        let (status, _) = get_json(unconfigured_app(), "/v1/health").await;
        assert_eq!(status, StatusCode::OK);

        let logs = captured.contents();
        assert!(logs.contains("finished processing request"), "{logs}");
        assert!(logs.contains("/v1/health"), "{logs}");
    }
}
