//! Route definitions for the `/batches` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::batches;
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// POST   /json            -> create_batch_json
/// GET    /{id}            -> get_batch
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/json", post(batches::create_batch_json))
        .route("/{id}", get(batches::get_batch))
}
