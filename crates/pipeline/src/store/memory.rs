//! In-process [`TrackStore`] used when no database is configured and by
//! tests.
//!
//! Records live in ordered maps behind a single mutex. The lock is never
//! held across an await point.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use songbatch_core::track_status::TrackStatus;
use songbatch_core::types::DbId;
use songbatch_db::models::batch::{Batch, CreateBatch};
use songbatch_db::models::track::{ArtifactMap, CreateTrack, GenerationIds, Track};
use songbatch_db::models::track_event::{NewTrackEvent, TrackEvent};
use sqlx::types::Json;

use super::{StoreError, TrackStore};

#[derive(Default)]
struct Inner {
    batches: BTreeMap<DbId, Batch>,
    tracks: BTreeMap<DbId, Track>,
    events: BTreeMap<DbId, TrackEvent>,
    next_batch_id: DbId,
    next_track_id: DbId,
    next_event_id: DbId,
}

impl Inner {
    fn insert_track(&mut self, batch_id: DbId, input: &CreateTrack) -> Track {
        self.next_track_id += 1;
        let now = Utc::now();
        let track = Track {
            id: self.next_track_id,
            batch_id,
            title: input.title.clone(),
            style: input.style.clone(),
            lyrics: input.lyrics.clone(),
            model: input.model.clone(),
            status_id: TrackStatus::Submitted.id(),
            target_duration_secs: input.target_duration_secs,
            final_duration_secs: None,
            native_wav: false,
            attempts: 0,
            extends_used: 0,
            generation_ids: Json(GenerationIds::new()),
            artifacts: Json(ArtifactMap::new()),
            file_path: None,
            submitted_at: None,
            generated_at: None,
            completed_at: None,
            metadata: Json(input.metadata.clone()),
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.tracks.insert(track.id, track.clone());
        track
    }
}

/// Volatile store; everything is lost when the process exits.
#[derive(Default)]
pub struct MemoryTrackStore {
    inner: Mutex<Inner>,
}

impl MemoryTrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TrackStore for MemoryTrackStore {
    async fn fetch_batch(&self, id: DbId) -> Result<Batch, StoreError> {
        self.lock()
            .batches
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "Batch",
                id,
            })
    }

    async fn fetch_track(&self, id: DbId) -> Result<Track, StoreError> {
        self.lock()
            .tracks
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound {
                entity: "Track",
                id,
            })
    }

    async fn update_track(&self, track: &Track) -> Result<Track, StoreError> {
        let mut inner = self.lock();
        let stored = inner.tracks.get_mut(&track.id).ok_or(StoreError::NotFound {
            entity: "Track",
            id: track.id,
        })?;

        // Identity and prompt fields stay as created.
        stored.status_id = track.status_id;
        stored.final_duration_secs = track.final_duration_secs;
        stored.native_wav = track.native_wav;
        stored.attempts = track.attempts;
        stored.extends_used = track.extends_used;
        stored.generation_ids = track.generation_ids.clone();
        stored.artifacts = track.artifacts.clone();
        stored.file_path = track.file_path.clone();
        stored.submitted_at = track.submitted_at;
        stored.generated_at = track.generated_at;
        stored.completed_at = track.completed_at;
        stored.last_error = track.last_error.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn append_event(&self, event: &NewTrackEvent) -> Result<TrackEvent, StoreError> {
        let mut inner = self.lock();
        if !inner.tracks.contains_key(&event.track_id) {
            return Err(StoreError::NotFound {
                entity: "Track",
                id: event.track_id,
            });
        }
        inner.next_event_id += 1;
        let stored = TrackEvent {
            id: inner.next_event_id,
            track_id: event.track_id,
            stage: event.stage.clone(),
            detail: event.detail.clone(),
            created_at: event.created_at,
        };
        inner.events.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn create_batch(
        &self,
        batch: &CreateBatch,
        tracks: &[CreateTrack],
    ) -> Result<(Batch, Vec<Track>), StoreError> {
        let mut inner = self.lock();
        inner.next_batch_id += 1;
        let now = Utc::now();
        let created = Batch {
            id: inner.next_batch_id,
            parameters: Json(batch.parameters.clone()),
            initiator: batch.initiator.clone(),
            total_files: i32::try_from(tracks.len()).unwrap_or(i32::MAX),
            created_at: now,
            updated_at: now,
        };
        inner.batches.insert(created.id, created.clone());

        let members = tracks
            .iter()
            .map(|t| inner.insert_track(created.id, t))
            .collect();
        Ok((created, members))
    }

    async fn create_track(
        &self,
        batch_id: DbId,
        track: &CreateTrack,
    ) -> Result<Track, StoreError> {
        let mut inner = self.lock();
        let batch = inner.batches.get_mut(&batch_id).ok_or(StoreError::NotFound {
            entity: "Batch",
            id: batch_id,
        })?;
        batch.total_files += 1;
        batch.updated_at = Utc::now();
        Ok(inner.insert_track(batch_id, track))
    }

    async fn list_tracks(&self, batch_id: DbId) -> Result<Vec<Track>, StoreError> {
        Ok(self
            .lock()
            .tracks
            .values()
            .filter(|t| t.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn list_events(&self, track_id: DbId) -> Result<Vec<TrackEvent>, StoreError> {
        let mut events: Vec<TrackEvent> = self
            .lock()
            .events
            .values()
            .filter(|e| e.track_id == track_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
