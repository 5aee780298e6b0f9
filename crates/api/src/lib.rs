//! HTTP API server with observability for ride settlement.
//!
//! Provides REST endpoints for the room lifecycle, fare settlement and route
//! history, with structured logging (tracing) and Prometheus metrics.

pub mod caller;
pub mod config;
pub mod error;
pub mod json;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::export))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/rooms", post(routes::rooms::create).get(routes::rooms::list))
        .route("/rooms/{id}", get(routes::rooms::get))
        .route("/rooms/{id}/join", post(routes::rooms::join))
        .route("/rooms/{id}/exit", post(routes::rooms::exit))
        .route("/rooms/{id}/complete", post(routes::rooms::complete))
        .route("/payments/process", post(routes::payments::process))
        .route("/payments/refund", post(routes::payments::refund))
        .route("/payments/history", get(routes::payments::history))
        .route("/payments/{id}", get(routes::payments::details))
        .route("/routes/history", get(routes::history::list))
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

/// Creates the default application state with in-memory stores and the local gateway.
pub fn create_default_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory())
}
