//! [`TrackStore`] backed by the Postgres repositories.

use async_trait::async_trait;
use songbatch_core::types::DbId;
use songbatch_db::models::batch::{Batch, CreateBatch};
use songbatch_db::models::track::{CreateTrack, Track};
use songbatch_db::models::track_event::{NewTrackEvent, TrackEvent};
use songbatch_db::repositories::{BatchRepo, TrackEventRepo, TrackRepo};
use songbatch_db::DbPool;

use super::{StoreError, TrackStore};

/// Store over a shared connection pool.
#[derive(Clone)]
pub struct PgTrackStore {
    pool: DbPool,
}

impl PgTrackStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl TrackStore for PgTrackStore {
    async fn fetch_batch(&self, id: DbId) -> Result<Batch, StoreError> {
        BatchRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Batch",
                id,
            })
    }

    async fn fetch_track(&self, id: DbId) -> Result<Track, StoreError> {
        TrackRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: "Track",
                id,
            })
    }

    async fn update_track(&self, track: &Track) -> Result<Track, StoreError> {
        match TrackRepo::update(&self.pool, track).await {
            Err(sqlx::Error::RowNotFound) => Err(StoreError::NotFound {
                entity: "Track",
                id: track.id,
            }),
            other => Ok(other?),
        }
    }

    async fn append_event(&self, event: &NewTrackEvent) -> Result<TrackEvent, StoreError> {
        Ok(TrackEventRepo::append(&self.pool, event).await?)
    }

    async fn create_batch(
        &self,
        batch: &CreateBatch,
        tracks: &[CreateTrack],
    ) -> Result<(Batch, Vec<Track>), StoreError> {
        Ok(BatchRepo::create_with_tracks(&self.pool, batch, tracks).await?)
    }

    async fn create_track(
        &self,
        batch_id: DbId,
        track: &CreateTrack,
    ) -> Result<Track, StoreError> {
        let mut tx = self.pool.begin().await?;
        if !BatchRepo::increment_total_files(&mut *tx, batch_id).await? {
            return Err(StoreError::NotFound {
                entity: "Batch",
                id: batch_id,
            });
        }
        let created = TrackRepo::create(&mut *tx, batch_id, track).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn list_tracks(&self, batch_id: DbId) -> Result<Vec<Track>, StoreError> {
        Ok(TrackRepo::list_by_batch(&self.pool, batch_id).await?)
    }

    async fn list_events(&self, track_id: DbId) -> Result<Vec<TrackEvent>, StoreError> {
        Ok(TrackEventRepo::list_by_track(&self.pool, track_id).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(songbatch_db::health_check(&self.pool).await?)
    }
}
