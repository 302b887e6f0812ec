//! Bounded-concurrency execution of a batch's track jobs.
//!
//! One task per track runs under a per-batch admission gate sized by the
//! batch's concurrency. Failures stay inside their track: a job that panics
//! is logged and its track forced to `error`, siblings keep running.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use songbatch_core::track_events::STAGE_ERROR;
use songbatch_core::track_status::TrackStatus;
use songbatch_core::types::DbId;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::task::TaskTracker;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event_log::EventLog;
use crate::service::GenerationService;
use crate::store::TrackStore;
use crate::track_job::TrackJob;

/// Per-status counts after a batch run. Logged, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchRunSummary {
    pub batch_id: DbId,
    pub total: usize,
    pub finalized: usize,
    pub errored: usize,
    /// Tracks already terminal when the run started.
    pub skipped: usize,
}

impl BatchRunSummary {
    fn record(&mut self, status: Option<TrackStatus>) {
        match status {
            Some(TrackStatus::Finalized) => self.finalized += 1,
            _ => self.errored += 1,
        }
    }
}

/// Runs batches against a store and a generation service.
///
/// Cheap to clone; clones share the store, the service, and the task
/// tracker used for fire-and-forget runs.
#[derive(Clone)]
pub struct BatchCoordinator {
    store: Arc<dyn TrackStore>,
    service: Arc<dyn GenerationService>,
    config: Arc<PipelineConfig>,
    tracker: TaskTracker,
}

impl BatchCoordinator {
    pub fn new(
        store: Arc<dyn TrackStore>,
        service: Arc<dyn GenerationService>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            service,
            config: Arc::new(config),
            tracker: TaskTracker::new(),
        }
    }

    /// Tracker owning every task spawned by [`Self::start_batch_processing`].
    /// Close and wait on it to drain in-flight batches at shutdown.
    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Spawn [`Self::run_batch`] and return immediately.
    pub fn start_batch_processing(&self, batch_id: DbId) -> JoinHandle<()> {
        let coordinator = self.clone();
        self.tracker.spawn(async move {
            if let Err(e) = coordinator.run_batch(batch_id).await {
                tracing::error!(batch_id, error = %e, "Batch processing failed");
            }
        })
    }

    /// Run every non-terminal track of a batch to a terminal status.
    ///
    /// Returns once all jobs finished. Errors only when the batch or its
    /// track list cannot be loaded.
    pub async fn run_batch(&self, batch_id: DbId) -> Result<BatchRunSummary, PipelineError> {
        let batch = self.store.fetch_batch(batch_id).await?;
        let params = Arc::new(batch.parameters.0);
        let tracks = self.store.list_tracks(batch_id).await?;
        let concurrency = params.effective_concurrency();
        let gate = Arc::new(Semaphore::new(concurrency));

        let mut summary = BatchRunSummary {
            batch_id,
            total: tracks.len(),
            ..Default::default()
        };

        tracing::info!(
            batch_id,
            tracks = tracks.len(),
            concurrency,
            "Starting batch processing"
        );

        let mut jobs = JoinSet::new();
        for track in tracks {
            if track.status().is_some_and(TrackStatus::is_terminal) {
                summary.skipped += 1;
                continue;
            }
            let track_id = track.id;
            let job = TrackJob::new(
                track,
                Arc::clone(&params),
                Arc::clone(&self.store),
                Arc::clone(&self.service),
                Arc::clone(&gate),
                Arc::clone(&self.config),
            );
            // The inner task isolates a panicking job so its track id is
            // still known when the outer task reports back.
            jobs.spawn(async move { (track_id, tokio::spawn(job.run()).await) });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((_, Ok(track))) => summary.record(track.status()),
                Ok((track_id, Err(e))) => {
                    tracing::error!(batch_id, track_id, error = %e, "Track job panicked");
                    self.force_error(track_id, format!("Track job aborted: {e}"))
                        .await;
                    summary.errored += 1;
                }
                Err(e) => {
                    tracing::error!(batch_id, error = %e, "Track job supervisor failed");
                    summary.errored += 1;
                }
            }
        }

        tracing::info!(
            batch_id,
            total = summary.total,
            finalized = summary.finalized,
            errored = summary.errored,
            skipped = summary.skipped,
            "Batch processing complete"
        );
        Ok(summary)
    }

    /// Force a track whose job died into `error`, unless it already reached
    /// a terminal status.
    async fn force_error(&self, track_id: DbId, detail: String) {
        let result: Result<(), PipelineError> = async {
            let mut track = self.store.fetch_track(track_id).await?;
            if track.status().is_some_and(TrackStatus::is_terminal) {
                return Ok(());
            }
            track.set_status(TrackStatus::Error);
            track.last_error = Some(detail.clone());
            track.completed_at = Some(Utc::now());
            self.store.update_track(&track).await?;
            let mut events = EventLog::resume(Arc::clone(&self.store), track_id).await?;
            events.record(STAGE_ERROR, Some(detail)).await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(track_id, error = %e, "Failed to mark aborted track as error");
        }
    }
}
