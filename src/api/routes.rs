//! API Routes
//!
//! Configures the Axum router with all cache gateway endpoints.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, delete_pattern_handler, exists_handler, get_handler, health_handler,
    set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /entries/:key` - Store a JSON value with an optional lifetime
/// - `GET /entries/:key` - Retrieve a value by key
/// - `GET /entries/:key/exists` - Check whether a key is present
/// - `DELETE /entries/:key` - Delete a key
/// - `DELETE /entries?pattern=<glob>` - Delete every key matching a pattern
/// - `GET /stats` - Get provider statistics
/// - `GET /health` - Health check endpoint
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
        .route("/entries", delete(delete_pattern_handler))
        .route(
            "/entries/:key",
            put(set_handler).get(get_handler).delete(delete_handler),
        )
        .route("/entries/:key/exists", get(exists_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
