//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::account::{refresh, session, sign_in, sign_out, sign_up};
use crate::handlers::listings::{get_job, list_filters, list_jobs, list_slugs};
use crate::handlers::manage::{create_job, delete_job, my_filters, my_job, my_jobs, update_job};
use crate::handlers::{health, ready};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let public_routes = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/filters", get(list_filters))
        .route("/jobs/slugs", get(list_slugs))
        .route("/jobs/:slug", get(get_job));

    let owner_routes = Router::new()
        .route("/me/jobs", get(my_jobs).post(create_job))
        .route("/me/jobs/filters", get(my_filters))
        .route("/me/jobs/:slug", get(my_job).put(update_job).delete(delete_job));

    let auth_routes = Router::new()
        .route("/sign-up", post(sign_up))
        .route("/sign-in", post(sign_in))
        .route("/refresh", post(refresh))
        .route("/sign-out", post(sign_out))
        .route("/session", get(session));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(owner_routes)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&rate_limiter),
            rate_limit_middleware,
        ));

    // Credential endpoints get their own, stricter budget
    let auth_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_rps.div_ceil(2)));
    let auth_routes = auth_routes.layer(middleware::from_fn_with_state(auth_limiter, rate_limit_middleware));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .nest("/api", api_routes)
        .nest("/auth", auth_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
