//! Repository for the `batches` table.

use sqlx::types::Json;
use sqlx::PgPool;
use songbatch_core::types::DbId;

use crate::models::batch::{Batch, CreateBatch};
use crate::models::track::{CreateTrack, Track};
use crate::repositories::track_repo::TrackRepo;

/// Column list for `batches` queries.
const COLUMNS: &str = "id, parameters, initiator, total_files, created_at, updated_at";

/// Provides create and read operations for batches.
pub struct BatchRepo;

impl BatchRepo {
    /// Insert a batch and all of its tracks in one transaction.
    ///
    /// Either every track is persisted in `submitted` status or nothing is.
    pub async fn create_with_tracks(
        pool: &PgPool,
        input: &CreateBatch,
        tracks: &[CreateTrack],
    ) -> Result<(Batch, Vec<Track>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO batches (parameters, initiator, total_files) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        let batch = sqlx::query_as::<_, Batch>(&query)
            .bind(Json(&input.parameters))
            .bind(&input.initiator)
            .bind(tracks.len() as i32)
            .fetch_one(&mut *tx)
            .await?;

        let mut created = Vec::with_capacity(tracks.len());
        for track in tracks {
            created.push(TrackRepo::create(&mut *tx, batch.id, track).await?);
        }

        tx.commit().await?;

        tracing::debug!(batch_id = batch.id, tracks = created.len(), "Batch created");
        Ok((batch, created))
    }

    /// Find a batch by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Batch>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM batches WHERE id = $1");
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Bump the member-track count after a track was added to an existing
    /// batch.
    pub async fn increment_total_files<'e, E>(executor: E, id: DbId) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query("UPDATE batches SET total_files = total_files + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
