//! API Routes
//!
//! Configures the Axum router with all page resolver endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    attach_setting_handler, conversion_handler, create_setting_handler, delete_setting_handler,
    get_setting_handler, health_handler, invalidate_handler, resolve_handler, run_sweep_handler,
    stats_handler, update_setting_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /p/:short_id` - Resolve a page for a visitor
/// - `POST /pages/:page_id/conversions` - Record a conversion
/// - `GET /pages/:page_id/stats` - Engagement counters
/// - `DELETE /cache/:short_id` - Drop a cached page
/// - `POST /expiration-settings` - Create an expiration policy
/// - `GET|PUT|DELETE /expiration-settings/:id` - Read, patch, delete a policy
/// - `PUT /versions/:version_id/expiration/:setting_id` - Attach a policy
/// - `POST /expirations/run` - Run an expiration sweep now
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (public pages are embedded anywhere)
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/p/:short_id", get(resolve_handler))
        .route("/pages/:page_id/conversions", post(conversion_handler))
        .route("/pages/:page_id/stats", get(stats_handler))
        .route("/cache/:short_id", delete(invalidate_handler))
        .route("/expiration-settings", post(create_setting_handler))
        .route(
            "/expiration-settings/:id",
            get(get_setting_handler)
                .put(update_setting_handler)
                .delete(delete_setting_handler),
        )
        .route(
            "/versions/:version_id/expiration/:setting_id",
            put(attach_setting_handler),
        )
        .route("/expirations/run", post(run_sweep_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
