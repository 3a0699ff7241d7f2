//! API routes

pub mod auth;
pub mod documents;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::server::middleware::require_auth;
use crate::server::state::AppState;

/// Build the authentication routes (no session required)
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Build the document/query API routes; every route requires a valid session
pub fn api_routes(state: AppState) -> Router<AppState> {
    let max_upload_size = state.config().server.max_upload_size;

    Router::new()
        // Document management
        .route("/documents", get(documents::list_documents))
        .route("/documents/:id", delete(documents::delete_document))
        // Ingestion - with a body limit slightly above the per-file cap to
        // leave room for multipart framing
        .route(
            "/ingest",
            post(ingest::ingest_files)
                .layer(DefaultBodyLimit::max(max_upload_size + 64 * 1024)),
        )
        // Query
        .route("/query", post(query::query))
        .route_layer(middleware::from_fn_with_state(state, require_auth))
}
