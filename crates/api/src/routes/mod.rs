pub mod batches;
pub mod health;
pub mod tracks;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree, except multipart intake.
///
/// Route hierarchy:
///
/// ```text
/// /models                        available model ids
///
/// /batches/json                  intake with inline prompts (POST)
/// /batches/{id}                  batch with status and tracks
///
/// /tracks/{id}                   track with events
/// /tracks/{id}/events            events only
/// /tracks/{id}/download          artifact bytes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(handlers::models::list_models))
        .nest("/batches", batches::router())
        .nest("/tracks", tracks::router())
}

/// `POST /api/v1/batches` (multipart intake).
///
/// Kept apart from [`api_routes`] so it gets its own body limit and no
/// request timeout.
pub fn upload_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new().route(
        "/api/v1/batches",
        post(handlers::batches::create_batch).layer(DefaultBodyLimit::max(max_upload_bytes)),
    )
}
