//! API Routes
//!
//! Configures the Axum router with all driver endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_all_handler, clear_path_handler, drivers_handler, get_handler, health_handler,
    purge_handler, stats_handler, store_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /items` - Store a value under a key path
/// - `DELETE /items` - Clear the whole namespace
/// - `GET /items/*path` - Retrieve the record at a path
/// - `DELETE /items/*path` - Clear a path and everything below it
/// - `POST /purge` - Sweep expired entries
/// - `GET /stats` - Operation counters
/// - `GET /health` - Health check endpoint
/// - `GET /drivers` - Driver availability on this host
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/items", put(store_handler).delete(clear_all_handler))
        .route("/items/*path", get(get_handler).delete(clear_path_handler))
        .route("/purge", post(purge_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .route("/drivers", get(drivers_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
