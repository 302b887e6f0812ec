use std::sync::Arc;

use songbatch_pipeline::{BatchCoordinator, TrackStore};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Batch, track and event persistence.
    pub store: Arc<dyn TrackStore>,
    /// Schedules processing of newly created batches.
    pub coordinator: BatchCoordinator,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
