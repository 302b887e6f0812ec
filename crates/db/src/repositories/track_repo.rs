//! Repository for the `tracks` table.
//!
//! Uses `TrackStatus` from `songbatch_core::track_status` for status ids.
//! Updates are full-record writes: the track job owns its row for the
//! duration of a run and persists after every state-affecting step.

use sqlx::PgPool;
use songbatch_core::track_status::TrackStatus;
use songbatch_core::types::DbId;

use crate::models::track::{CreateTrack, Track};

/// Column list for `tracks` queries.
const COLUMNS: &str = "\
    id, batch_id, title, style, lyrics, model, status_id, \
    target_duration_secs, final_duration_secs, native_wav, \
    attempts, extends_used, generation_ids, artifacts, file_path, \
    submitted_at, generated_at, completed_at, metadata, last_error, \
    created_at, updated_at";

/// Provides CRUD operations for tracks.
pub struct TrackRepo;

impl TrackRepo {
    /// Insert a new `submitted` track for a batch.
    pub async fn create<'e, E>(
        executor: E,
        batch_id: DbId,
        input: &CreateTrack,
    ) -> Result<Track, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tracks \
                 (batch_id, title, style, lyrics, model, status_id, \
                  target_duration_secs, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(batch_id)
            .bind(&input.title)
            .bind(&input.style)
            .bind(&input.lyrics)
            .bind(&input.model)
            .bind(TrackStatus::Submitted.id())
            .bind(input.target_duration_secs)
            .bind(sqlx::types::Json(&input.metadata))
            .fetch_one(executor)
            .await
    }

    /// Find a track by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE id = $1");
        sqlx::query_as::<_, Track>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a batch's tracks in creation order.
    pub async fn list_by_batch(pool: &PgPool, batch_id: DbId) -> Result<Vec<Track>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tracks WHERE batch_id = $1 ORDER BY id");
        sqlx::query_as::<_, Track>(&query)
            .bind(batch_id)
            .fetch_all(pool)
            .await
    }

    /// Write every mutable column of `track` and return the stored row.
    ///
    /// Identity columns (`id`, `batch_id`, `created_at`) and the prompt
    /// fields are never rewritten.
    pub async fn update(pool: &PgPool, track: &Track) -> Result<Track, sqlx::Error> {
        let query = format!(
            "UPDATE tracks SET \
                 status_id = $2, final_duration_secs = $3, native_wav = $4, \
                 attempts = $5, extends_used = $6, generation_ids = $7, \
                 artifacts = $8, file_path = $9, submitted_at = $10, \
                 generated_at = $11, completed_at = $12, last_error = $13 \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Track>(&query)
            .bind(track.id)
            .bind(track.status_id)
            .bind(track.final_duration_secs)
            .bind(track.native_wav)
            .bind(track.attempts)
            .bind(track.extends_used)
            .bind(&track.generation_ids)
            .bind(&track.artifacts)
            .bind(&track.file_path)
            .bind(track.submitted_at)
            .bind(track.generated_at)
            .bind(track.completed_at)
            .bind(&track.last_error)
            .fetch_optional(pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
