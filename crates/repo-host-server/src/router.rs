//! Router construction for the repo host server.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use repo_host_core::ResourceGateway;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Build the full axum router with all routes and middleware.
pub fn build_router(gateway: Arc<ResourceGateway>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/create-repo", post(handlers::repos::create_repo))
        .route(
            "/create-directory",
            post(handlers::directories::create_directory),
        )
        .route(
            "/list-directories",
            get(handlers::directories::list_directories),
        )
        .route("/download-file", get(handlers::files::download_file))
        .route("/upload-file", put(handlers::files::upload_file))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(Extension(gateway))
        .layer(TraceLayer::new_for_http())
}
