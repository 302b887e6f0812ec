//! Batch orchestration: the per-track retry/extend state machine, the
//! bounded-concurrency coordinator that runs it, and the capabilities it
//! consumes (generation service and track store).

pub mod config;
pub mod coordinator;
pub mod error;
pub mod event_log;
pub mod service;
pub mod stitch;
pub mod store;
pub mod track_job;

pub use config::PipelineConfig;
pub use coordinator::{BatchCoordinator, BatchRunSummary};
pub use error::PipelineError;
pub use service::{
    ExtendRequest, GenerationError, GenerationOutput, GenerationRequest, GenerationService,
};
pub use store::{MemoryTrackStore, PgTrackStore, StoreError, TrackStore};
