//! Per-track audit trail.
//!
//! Every event goes to the store and to `tracing`. Timestamps are strictly
//! increasing per track at the store's microsecond precision, so ordering
//! by timestamp reproduces append order.

use std::sync::Arc;

use chrono::{Duration, DurationRound, Utc};
use songbatch_core::track_events::{
    STAGE_ATTEMPT_FAILED, STAGE_ERROR, STAGE_EXTEND_FAILED, STAGE_STITCH_SKIPPED,
};
use songbatch_core::types::{DbId, Timestamp};
use songbatch_db::models::track_event::{NewTrackEvent, TrackEvent};

use crate::store::{StoreError, TrackStore};

/// Appends events for one track.
pub struct EventLog {
    store: Arc<dyn TrackStore>,
    track_id: DbId,
    last: Option<Timestamp>,
}

impl EventLog {
    pub fn new(store: Arc<dyn TrackStore>, track_id: DbId) -> Self {
        Self {
            store,
            track_id,
            last: None,
        }
    }

    /// Continue a log that already has events, keeping timestamps after
    /// the latest stored one.
    pub async fn resume(store: Arc<dyn TrackStore>, track_id: DbId) -> Result<Self, StoreError> {
        let last = store
            .list_events(track_id)
            .await?
            .last()
            .map(|e| e.created_at);
        Ok(Self {
            store,
            track_id,
            last,
        })
    }

    pub fn track_id(&self) -> DbId {
        self.track_id
    }

    /// Append one event.
    pub async fn record(
        &mut self,
        stage: &str,
        detail: Option<String>,
    ) -> Result<TrackEvent, StoreError> {
        let created_at = self.next_timestamp();
        emit(self.track_id, stage, detail.as_deref());
        self.store
            .append_event(&NewTrackEvent {
                track_id: self.track_id,
                stage: stage.to_string(),
                detail,
                created_at,
            })
            .await
    }

    fn next_timestamp(&mut self) -> Timestamp {
        let now = Utc::now();
        let mut ts = now.duration_trunc(Duration::microseconds(1)).unwrap_or(now);
        if let Some(last) = self.last {
            if ts <= last {
                ts = last + Duration::microseconds(1);
            }
        }
        self.last = Some(ts);
        ts
    }
}

fn emit(track_id: DbId, stage: &str, detail: Option<&str>) {
    match stage {
        STAGE_ERROR => tracing::error!(track_id, stage, detail, "Track event"),
        STAGE_ATTEMPT_FAILED | STAGE_EXTEND_FAILED | STAGE_STITCH_SKIPPED => {
            tracing::warn!(track_id, stage, detail, "Track event")
        }
        _ => tracing::info!(track_id, stage, detail, "Track event"),
    }
}
