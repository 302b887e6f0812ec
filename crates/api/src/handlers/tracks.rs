//! Handlers for the `/tracks` resource: status, event history, and artifact
//! download.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use songbatch_core::duration::ArtifactKind;
use songbatch_core::error::CoreError;
use songbatch_core::naming::download_filename;
use songbatch_core::types::DbId;
use songbatch_db::models::track::Track;
use songbatch_db::models::track_event::TrackEvent;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A track row with its status name resolved.
#[derive(Debug, Serialize)]
pub struct TrackView {
    #[serde(flatten)]
    pub track: Track,
    /// `None` for a status id outside the lookup table.
    pub status: Option<&'static str>,
}

impl From<Track> for TrackView {
    fn from(track: Track) -> Self {
        let status = track.status().map(|s| s.as_str());
        Self { track, status }
    }
}

/// A track together with its ordered event history.
#[derive(Debug, Serialize)]
pub struct TrackDetail {
    #[serde(flatten)]
    pub track: TrackView,
    pub events: Vec<TrackEvent>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/tracks/{id}
pub async fn get_track(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<TrackDetail>>> {
    let track = state.store.fetch_track(id).await?;
    let events = state.store.list_events(id).await?;

    Ok(Json(DataResponse {
        data: TrackDetail {
            track: track.into(),
            events,
        },
    }))
}

/// GET /api/v1/tracks/{id}/events
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<TrackEvent>>>> {
    // 404 for unknown tracks rather than an empty list.
    state.store.fetch_track(id).await?;
    let events = state.store.list_events(id).await?;
    Ok(Json(DataResponse { data: events }))
}

/// GET /api/v1/tracks/{id}/download
///
/// Streams the track's current artifact. The content type follows the file
/// extension and the suggested filename is derived from the title.
pub async fn download_track(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let track = state.store.fetch_track(id).await?;
    let not_available = || {
        AppError::Core(CoreError::NotFound {
            entity: "AudioFile",
            id,
        })
    };

    let file_path = track.file_path.as_deref().ok_or_else(not_available)?;
    let path = FsPath::new(file_path);
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_available()),
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    let kind = ArtifactKind::from_path(path);
    let filename = download_filename(track.id, &track.title, kind);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, kind.mime_type())
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}
