//! Track event (audit log) model and DTO.

use serde::Serialize;
use songbatch_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `track_events` table. Rows are never updated.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TrackEvent {
    pub id: DbId,
    pub track_id: DbId,
    pub stage: String,
    pub detail: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for appending an event. The timestamp is chosen by the caller so
/// that per-track ordering is decided in one place.
#[derive(Debug, Clone)]
pub struct NewTrackEvent {
    pub track_id: DbId,
    pub stage: String,
    pub detail: Option<String>,
    pub created_at: Timestamp,
}
