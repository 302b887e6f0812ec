//! Repository for the append-only `track_events` table.

use sqlx::PgPool;
use songbatch_core::types::DbId;

use crate::models::track_event::{NewTrackEvent, TrackEvent};

/// Column list for `track_events` queries.
const COLUMNS: &str = "id, track_id, stage, detail, created_at";

/// Provides append and read operations for track events.
pub struct TrackEventRepo;

impl TrackEventRepo {
    /// Append one event, returning the stored row.
    pub async fn append(pool: &PgPool, event: &NewTrackEvent) -> Result<TrackEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO track_events (track_id, stage, detail, created_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TrackEvent>(&query)
            .bind(event.track_id)
            .bind(&event.stage)
            .bind(&event.detail)
            .bind(event.created_at)
            .fetch_one(pool)
            .await
    }

    /// List a track's events in append order.
    pub async fn list_by_track(
        pool: &PgPool,
        track_id: DbId,
    ) -> Result<Vec<TrackEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM track_events WHERE track_id = $1 ORDER BY created_at, id"
        );
        sqlx::query_as::<_, TrackEvent>(&query)
            .bind(track_id)
            .fetch_all(pool)
            .await
    }
}
