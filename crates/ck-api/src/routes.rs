//! API routes.

use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::ai::{
    generate_description, generate_script, generate_thumbnail, generate_titles,
};
use crate::handlers::user::{
    delete_creation, get_creation, get_credits, get_dashboard_overview, get_published_creations,
    toggle_like_creation, toggle_publish_creation,
};
use crate::handlers::{health, ready, root};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    ClientRateLimiter,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let ai_routes = Router::new()
        .route("/generate-titles", post(generate_titles))
        .route("/generate-description", post(generate_description))
        .route("/generate-script", post(generate_script))
        .route("/generate-thumbnail", post(generate_thumbnail));

    let user_routes = Router::new()
        .route("/credits", get(get_credits))
        .route("/get-dashboard-overview", get(get_dashboard_overview))
        .route("/get-creation/:id", get(get_creation))
        .route("/delete-creation/:id", delete(delete_creation))
        .route("/toggle-publish-creation/:id", post(toggle_publish_creation))
        .route("/toggle-like-creation", post(toggle_like_creation))
        .route("/get-published-creations", get(get_published_creations));

    let rate_limiter = ClientRateLimiter::new(
        state.config.rate_limit_rps,
        state.config.trust_proxy_headers,
    );

    let api_routes = Router::new()
        .nest("/ai", ai_routes)
        .nest("/user", user_routes)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ));

    let health_routes = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
