//! API Routes
//!
//! Configures the Axum router with all product service endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    batch_get_handler, get_fresh_product_handler, get_product_handler, health_handler,
    invalidate_handler, invalidate_many_handler, put_batch_handler, put_product_handler,
    search_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/products", put(put_product_handler))
        .route("/products/batch", post(batch_get_handler).put(put_batch_handler))
        .route("/products/search", post(search_handler))
        .route("/products/:id", get(get_product_handler))
        .route("/products/:id/fresh", get(get_fresh_product_handler))
        .route("/cache/products/invalidate", post(invalidate_many_handler))
        .route("/cache/products/:id", delete(invalidate_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
