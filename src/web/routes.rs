//! Route definitions

use super::handlers;
use super::state::AppState;
use axum::{routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Pages
        .route("/", get(handlers::index))
        .route("/search", get(handlers::search))
        .route("/filter", get(handlers::filter))
        .route("/results", get(handlers::results))
        // Downloads
        .route("/export", get(handlers::export))
        // API routes
        .route("/health", get(handlers::health))
        // Static routes
        .route("/robots.txt", get(handlers::robots_txt))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
