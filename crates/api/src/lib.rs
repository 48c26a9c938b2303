//! HTTP API for the storefront.
//!
//! REST endpoints for catalog, accounts, orders and riders under `/api`,
//! with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, patch, post, put};
use document_store::DocumentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use state::{AppState, create_state};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DocumentStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let api = Router::new()
        .route("/auth/register", post(routes::auth::register::<S>))
        .route("/auth/login", post(routes::auth::login::<S>))
        .route("/auth/me", get(routes::auth::me))
        .route(
            "/auth/users/{id}/approval",
            patch(routes::auth::set_approval::<S>),
        )
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/products/{id}/reviews",
            post(routes::products::add_review::<S>),
        )
        .route(
            "/orders",
            get(routes::orders::list_all::<S>).post(routes::orders::create::<S>),
        )
        .route("/orders/rider", get(routes::orders::rider_orders::<S>))
        .route("/orders/my-orders", get(routes::orders::my_orders::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route(
            "/orders/{id}/status",
            patch(routes::orders::change_status::<S>),
        )
        .route(
            "/orders/{id}/delivery",
            patch(routes::orders::report_delivery::<S>),
        )
        .route(
            "/riders",
            get(routes::riders::list::<S>).post(routes::riders::create::<S>),
        )
        .route("/riders/available", get(routes::riders::available::<S>))
        .route("/riders/{id}", put(routes::riders::update::<S>))
        .route("/riders/{id}/stats", get(routes::riders::stats::<S>));

    Router::new()
        .route("/health", get(routes::health::check))
        .nest("/api", api)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
