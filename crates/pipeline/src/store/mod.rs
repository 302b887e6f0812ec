//! The persistent store capability.
//!
//! The track job reads and writes through [`TrackStore`] after every
//! state-affecting step; nothing is cached between steps. Intake and the
//! HTTP presentation layer use the same trait for creation and reads.

use async_trait::async_trait;
use songbatch_core::types::DbId;
use songbatch_db::models::batch::{Batch, CreateBatch};
use songbatch_db::models::track::{CreateTrack, Track};
use songbatch_db::models::track_event::{NewTrackEvent, TrackEvent};

mod memory;
mod postgres;

pub use memory::MemoryTrackStore;
pub use postgres::PgTrackStore;

/// Errors from a [`TrackStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Key-indexed record store for batches, tracks, and track events.
#[async_trait]
pub trait TrackStore: Send + Sync {
    async fn fetch_batch(&self, id: DbId) -> Result<Batch, StoreError>;

    async fn fetch_track(&self, id: DbId) -> Result<Track, StoreError>;

    /// Write every mutable column of `track`, returning the stored record.
    async fn update_track(&self, track: &Track) -> Result<Track, StoreError>;

    /// Append one event to a track's audit log.
    async fn append_event(&self, event: &NewTrackEvent) -> Result<TrackEvent, StoreError>;

    /// Create a batch together with its `submitted` tracks, atomically.
    async fn create_batch(
        &self,
        batch: &CreateBatch,
        tracks: &[CreateTrack],
    ) -> Result<(Batch, Vec<Track>), StoreError>;

    /// Add one `submitted` track to an existing batch.
    async fn create_track(&self, batch_id: DbId, track: &CreateTrack)
        -> Result<Track, StoreError>;

    /// A batch's tracks in creation order.
    async fn list_tracks(&self, batch_id: DbId) -> Result<Vec<Track>, StoreError>;

    /// A track's events in append order.
    async fn list_events(&self, track_id: DbId) -> Result<Vec<TrackEvent>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}
