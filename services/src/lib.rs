//! Administrative backend: user accounts, an audit log and one-time PIN
//! issuance over PostgreSQL.
//!
//! [`routes`] assembles the complete HTTP surface over any [`AdminStorage`]
//! implementation, so the same router runs against `PgStorage` in production
//! and `MockStorage` in tests.

use axum::{
    Router,
    extract::{Extension, Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use opentelemetry::{global, propagation::Extractor};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::config::Config;
use crate::error::ApiError;

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod logs;
pub mod pins;
pub mod state;
pub mod telemetry;
pub mod users;

pub use state::{AdminStorage, AppState};

/// Version reported in the `x-service-version` health header.
pub const SERVICE_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_COMMIT"));

struct HeaderExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Builds the application router over `storage`.
pub async fn routes<S: AdminStorage>(storage: S, config: Config) -> Router {
    let state = AppState::new(storage);

    Router::new()
        .route("/is-health", get(health_check::<S>))
        .merge(auth::routes::routes::<S>())
        .merge(users::routes::routes::<S>())
        .merge(logs::routes::routes::<S>())
        .merge(pins::routes::routes::<S>())
        .fallback(catch_all)
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(middleware::from_fn_with_state(
            config.clone(),
            error::expose_error_details,
        ))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                // Adopt an incoming W3C trace context, if any
                let parent_context = global::get_text_map_propagator(|propagator| {
                    propagator.extract(&HeaderExtractor(request.headers()))
                });

                let span = tracing::info_span!(
                    "http_request",
                    http_request.method = ?request.method(),
                    http_request.uri = ?request.uri(),
                    http_request.version = ?request.version(),
                    http_request.user_agent = ?request.headers().get(header::USER_AGENT),
                );

                span.set_parent(parent_context);

                span
            }),
        )
        .layer(cors_layer(&config))
        .layer(Extension(config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    match config.cors_allowed_origins() {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            cors.allow_origin(AllowOrigin::list(origins))
        }
        None => cors.allow_origin(Any),
    }
}

async fn health_check<S: AdminStorage>(
    State(state): State<AppState<S>>,
    Extension(config): Extension<Config>,
) -> Response {
    let mut response = if state.storage.is_connected().await {
        (StatusCode::OK, "OK").into_response()
    } else {
        tracing::warn!("Health check failed: database unreachable");
        (StatusCode::BAD_GATEWAY, "502").into_response()
    };

    let headers = response.headers_mut();
    if let Ok(env) = HeaderValue::from_str(&config.environment().to_string()) {
        headers.insert(HeaderName::from_static("x-service-env"), env);
    }
    headers.insert(
        HeaderName::from_static("x-service-version"),
        HeaderValue::from_static(SERVICE_VERSION),
    );

    response
}

async fn catch_all() -> ApiError {
    ApiError::not_found("Resource not found")
}
