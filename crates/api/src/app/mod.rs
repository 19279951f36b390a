//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, photo storage and token signer construction
//! - `routes/`: HTTP handlers, one file per resource
//! - `dto.rs`: response envelopes
//! - `errors.rs`: the error envelope and status mapping

use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, header},
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer};

use craftmart_infra::config::AppConfig;
use craftmart_infra::handlers::ServiceResult;

use crate::middleware;
use crate::rate_limit::RateLimiter;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Largest accepted JSON request body.
pub const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// Room for multipart boundaries and part headers on top of the photo itself.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can see peer addresses.
pub async fn build_app(config: &AppConfig) -> ServiceResult<Router> {
    let services = Arc::new(services::build_services(config).await?);
    let limiter = Arc::new(RateLimiter::new(config.rate_limit));
    let photo_body_limit = config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = routes::router(photo_body_limit)
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(axum::middleware::from_fn_with_state(
            services.clone(),
            middleware::auth_middleware,
        ))
        .layer(Extension(services));

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-xss-protection"),
            HeaderValue::from_static("0"),
        ));

    Ok(Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", api)
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ))
        .layer(security_headers)
        .layer(TraceLayer::new_for_http()))
}
