//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, download_file, get_file, list_files, list_messages, post_message, stream_file,
    upload_files, AppState,
};
use super::middleware::create_cors_layer;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let upload_limit = app_state.config.storage.max_upload_bytes();

    // File routes
    let file_routes = Router::new()
        .route(
            "/",
            get(list_files)
                .post(upload_files)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/download", get(download_file))
        .route("/:id/stream", get(stream_file));

    // Chat routes
    let chat_routes = Router::new().route("/", get(list_messages).post(post_message));

    // API routes
    let api_routes = Router::new()
        .nest("/files", file_routes)
        .nest("/chat", chat_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}
