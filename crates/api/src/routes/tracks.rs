//! Route definitions for the `/tracks` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::tracks;
use crate::state::AppState;

/// Routes mounted at `/tracks`.
///
/// ```text
/// GET    /{id}            -> get_track
/// GET    /{id}/events     -> list_events
/// GET    /{id}/download   -> download_track
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", get(tracks::get_track))
        .route("/{id}/events", get(tracks::list_events))
        .route("/{id}/download", get(tracks::download_track))
}
