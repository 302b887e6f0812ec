use songbatch_core::track_status::{StatusId, TrackStatus};
use songbatch_core::types::DbId;

use crate::store::StoreError;

/// Unexpected failures inside a track job or the coordinator.
///
/// Generation failures are not represented here: the job handles those as
/// attempt or extension outcomes.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Track {track_id} cannot move from {from} to {to}")]
    InvalidTransition {
        track_id: DbId,
        from: TrackStatus,
        to: TrackStatus,
    },

    #[error("Track {track_id} has unknown status id {status_id}")]
    UnknownStatus { track_id: DbId, status_id: StatusId },

    #[error("Admission gate closed")]
    GateClosed,
}
