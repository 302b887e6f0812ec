//! The state machine driving one track from `submitted` to a terminal
//! status.
//!
//! ```text
//! submitted -> generating -> [extending]* -> finalized
//!                  |               |
//!                  +----> error <--+ (exhausted retries or unexpected failure)
//! ```
//!
//! The job persists the track after every state-affecting step and records
//! an event for each one. Generation failures are retried locally; an
//! extension failure ends the extend phase without failing the track. Any
//! other failure forces the track into `error`. Nothing escapes [`TrackJob::run`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use songbatch_core::batch::{BatchParameters, EXTENSION_INCREMENT_SECS};
use songbatch_core::track_events::{
    extend_generation_key, INITIAL_GENERATION_KEY, STAGE_ATTEMPT_FAILED, STAGE_ATTEMPT_STARTED,
    STAGE_ERROR, STAGE_EXTENDED, STAGE_EXTENDING, STAGE_EXTEND_FAILED, STAGE_FINALIZED,
    STAGE_GENERATED, STAGE_GENERATING, STAGE_STITCHED, STAGE_STITCH_SKIPPED,
};
use songbatch_core::track_status::TrackStatus;
use songbatch_db::models::track::Track;
use tokio::sync::Semaphore;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::event_log::EventLog;
use crate::service::{
    ExtendRequest, GenerationError, GenerationOutput, GenerationRequest, GenerationService,
};
use crate::stitch::Stitcher;
use crate::store::TrackStore;

/// How the generation phase ended.
enum GenerationOutcome {
    Generated,
    /// Every attempt failed; carries the last failure detail.
    Exhausted(String),
}

/// Drives a single track. Consumed by [`TrackJob::run`].
pub struct TrackJob {
    track: Track,
    params: Arc<BatchParameters>,
    store: Arc<dyn TrackStore>,
    service: Arc<dyn GenerationService>,
    gate: Arc<Semaphore>,
    config: Arc<PipelineConfig>,
    events: EventLog,
}

impl TrackJob {
    pub fn new(
        track: Track,
        params: Arc<BatchParameters>,
        store: Arc<dyn TrackStore>,
        service: Arc<dyn GenerationService>,
        gate: Arc<Semaphore>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        let events = EventLog::new(Arc::clone(&store), track.id);
        Self {
            track,
            params,
            store,
            service,
            gate,
            config,
            events,
        }
    }

    /// Run the track to a terminal status and return its final record.
    pub async fn run(mut self) -> Track {
        let track_id = self.track.id;
        if self.track.status().is_some_and(TrackStatus::is_terminal) {
            tracing::debug!(track_id, status_id = self.track.status_id, "Track already terminal");
            return self.track;
        }
        if let Err(e) = self.drive().await {
            tracing::error!(track_id, error = %e, "Track job failed unexpectedly");
            self.force_error(e.to_string()).await;
        }
        self.track
    }

    async fn drive(&mut self) -> Result<(), PipelineError> {
        // A re-run appends after whatever an earlier run stored.
        self.events = EventLog::resume(Arc::clone(&self.store), self.track.id).await?;

        let permit = Arc::clone(&self.gate)
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::GateClosed)?;

        self.begin().await?;
        let outcome = match self.generate_with_retries().await? {
            GenerationOutcome::Generated => {
                self.extend_phase().await?;
                if self.config.stitch_extensions && self.track.extends_used > 0 {
                    self.stitch_segments().await?;
                }
                GenerationOutcome::Generated
            }
            exhausted => exhausted,
        };
        drop(permit);

        self.finish(outcome).await
    }

    // ---------------------------------------------------------------------------
    // Phases
    // ---------------------------------------------------------------------------

    /// Enter `generating`. A run always starts from a fresh generation, so
    /// counters and results of an interrupted earlier run are cleared.
    async fn begin(&mut self) -> Result<(), PipelineError> {
        self.transition(TrackStatus::Generating)?;
        self.track.attempts = 0;
        self.track.extends_used = 0;
        self.track.final_duration_secs = None;
        self.track.generation_ids.clear();
        self.track.artifacts.clear();
        self.track.file_path = None;
        self.track.last_error = None;
        self.track.submitted_at = Some(Utc::now());
        self.persist().await?;
        self.events
            .record(
                STAGE_GENERATING,
                Some(format!("Generating with model {}", self.track.model)),
            )
            .await?;
        Ok(())
    }

    async fn generate_with_retries(&mut self) -> Result<GenerationOutcome, PipelineError> {
        let retries = self.params.retries.max(1);
        let request = GenerationRequest {
            title: self.track.title.clone(),
            style: self.track.style.clone(),
            lyrics: self.track.lyrics.clone(),
            model: self.track.model.clone(),
            target_duration_secs: self.track.target_duration_secs,
            prefer_wav: self.params.prefer_wav,
            allow_mp3_to_wav: self.params.allow_mp3_to_wav,
            instrumental: self.params.instrumental,
        };
        let mut last_failure = String::from("No generation attempt was made");

        for attempt in 1..=retries {
            self.track.attempts = i32::try_from(attempt).unwrap_or(i32::MAX);
            self.persist().await?;
            self.events
                .record(
                    STAGE_ATTEMPT_STARTED,
                    Some(format!("Starting attempt {attempt} of {retries}")),
                )
                .await?;

            let timeout = self.params.attempt_timeout();
            let result = match tokio::time::timeout(timeout, self.service.generate(&request)).await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(timeout)),
            };

            match result {
                Ok(output) => {
                    self.accept_generation(output).await?;
                    return Ok(GenerationOutcome::Generated);
                }
                Err(e) => {
                    last_failure = e.to_string();
                    self.events
                        .record(
                            STAGE_ATTEMPT_FAILED,
                            Some(format!("Attempt {attempt}: {last_failure}")),
                        )
                        .await?;
                    if attempt < retries && !self.config.retry_delay.is_zero() {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        Ok(GenerationOutcome::Exhausted(last_failure))
    }

    async fn accept_generation(&mut self, output: GenerationOutput) -> Result<(), PipelineError> {
        let duration = self.estimate_duration(&output.artifacts.local_path).await;

        self.track.generation_ids.insert(
            INITIAL_GENERATION_KEY.to_string(),
            output.generation_id.clone(),
        );
        self.track.native_wav = output.is_native_format;
        self.track.file_path = Some(path_string(&output.artifacts.local_path));
        self.track
            .artifacts
            .insert(INITIAL_GENERATION_KEY.to_string(), output.artifacts);
        self.track.generated_at = Some(Utc::now());
        self.track.final_duration_secs = duration;
        self.persist().await?;

        let detail = match duration {
            Some(secs) => format!("Generated {} (~{secs:.1}s)", output.generation_id),
            None => format!("Generated {} (duration unknown)", output.generation_id),
        };
        self.events.record(STAGE_GENERATED, Some(detail)).await?;
        Ok(())
    }

    async fn extend_phase(&mut self) -> Result<(), PipelineError> {
        if !self.params.extend_enabled {
            return Ok(());
        }
        let target = self.track.target_duration_secs;
        let max_extends = self.params.extends_max;

        loop {
            let used = u32::try_from(self.track.extends_used).unwrap_or(u32::MAX);
            if used >= max_extends {
                break;
            }
            let Some(current) = self.track.final_duration_secs else {
                break;
            };
            if current >= target {
                break;
            }
            let Some(generation_id) = self.track.latest_generation_id().map(str::to_owned) else {
                break;
            };

            let n = used + 1;
            self.transition(TrackStatus::Extending)?;
            self.persist().await?;
            self.events
                .record(
                    STAGE_EXTENDING,
                    Some(format!(
                        "Extension {n} of {max_extends}: ~{current:.1}s of {target:.1}s"
                    )),
                )
                .await?;

            let request = ExtendRequest {
                generation_id,
                extension_secs: EXTENSION_INCREMENT_SECS,
                prefer_wav: self.params.prefer_wav,
                model: self.track.model.clone(),
            };
            let timeout = self.params.attempt_timeout();
            let result = match tokio::time::timeout(timeout, self.service.extend(&request)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(timeout)),
            };

            let output = match result {
                Ok(output) => output,
                Err(e) => {
                    self.events
                        .record(STAGE_EXTEND_FAILED, Some(format!("Extension {n}: {e}")))
                        .await?;
                    break;
                }
            };

            let added = self
                .estimate_duration(&output.artifacts.local_path)
                .await
                .unwrap_or(EXTENSION_INCREMENT_SECS);
            let total = current + added;
            let key = extend_generation_key(n);

            self.track.extends_used = i32::try_from(n).unwrap_or(i32::MAX);
            self.track
                .generation_ids
                .insert(key.clone(), output.generation_id.clone());
            self.track.native_wav = output.is_native_format;
            self.track.file_path = Some(path_string(&output.artifacts.local_path));
            self.track.artifacts.insert(key, output.artifacts);
            self.track.final_duration_secs = Some(total);
            self.persist().await?;
            self.events
                .record(
                    STAGE_EXTENDED,
                    Some(format!(
                        "Extension {n} {} added ~{added:.1}s, total ~{total:.1}s",
                        output.generation_id
                    )),
                )
                .await?;
        }
        Ok(())
    }

    /// Join the initial and extension segments. Never fails the track.
    async fn stitch_segments(&mut self) -> Result<(), PipelineError> {
        let segments: Vec<PathBuf> = self
            .track
            .ordered_segments()
            .into_iter()
            .map(|a| a.local_path.clone())
            .collect();
        let expected = usize::try_from(self.track.extends_used).unwrap_or(0) + 1;
        if segments.len() != expected {
            self.events
                .record(
                    STAGE_STITCH_SKIPPED,
                    Some(format!(
                        "Expected {expected} segments, found {}",
                        segments.len()
                    )),
                )
                .await?;
            return Ok(());
        }

        let count = segments.len();
        let stitcher = Stitcher::new(&self.config.output_dir);
        match stitcher.stitch(self.track.id, segments).await {
            Ok(path) => {
                self.track.file_path = Some(path_string(&path));
                self.persist().await?;
                self.events
                    .record(
                        STAGE_STITCHED,
                        Some(format!("Joined {count} segments into {}", path.display())),
                    )
                    .await?;
            }
            Err(e) => {
                self.events
                    .record(STAGE_STITCH_SKIPPED, Some(e.to_string()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn finish(&mut self, outcome: GenerationOutcome) -> Result<(), PipelineError> {
        match outcome {
            GenerationOutcome::Generated => {
                self.transition(TrackStatus::Finalized)?;
                self.track.completed_at = Some(Utc::now());
                self.persist().await?;
                let duration = self
                    .track
                    .final_duration_secs
                    .map(|d| format!("~{d:.1}s"))
                    .unwrap_or_else(|| "unknown duration".to_string());
                self.events
                    .record(
                        STAGE_FINALIZED,
                        Some(format!(
                            "Finalized at {duration} after {} attempt(s) and {} extension(s)",
                            self.track.attempts, self.track.extends_used
                        )),
                    )
                    .await?;
            }
            GenerationOutcome::Exhausted(detail) => {
                self.transition(TrackStatus::Error)?;
                self.track.last_error = Some(detail.clone());
                self.track.completed_at = Some(Utc::now());
                self.persist().await?;
                self.events
                    .record(
                        STAGE_ERROR,
                        Some(format!(
                            "Giving up after {} attempt(s): {detail}",
                            self.track.attempts
                        )),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Best-effort terminal write after an unexpected failure. A track whose
    /// stored record is already terminal keeps that status.
    async fn force_error(&mut self, detail: String) {
        let track_id = self.track.id;
        match self.store.fetch_track(track_id).await {
            Ok(stored) if stored.status().is_some_and(TrackStatus::is_terminal) => {
                tracing::warn!(
                    track_id,
                    status_id = stored.status_id,
                    error = %detail,
                    "Track already terminal, keeping stored status"
                );
                self.track = stored;
                return;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(track_id, error = %e, "Failed to reload track before forcing error");
            }
        }

        self.track.set_status(TrackStatus::Error);
        self.track.last_error = Some(detail.clone());
        self.track.completed_at = Some(Utc::now());

        if let Err(e) = self.events.record(STAGE_ERROR, Some(detail)).await {
            tracing::error!(track_id, error = %e, "Failed to record error event");
        }
        match self.store.update_track(&self.track).await {
            Ok(stored) => self.track = stored,
            Err(e) => tracing::error!(track_id, error = %e, "Failed to persist errored track"),
        }
    }

    // ---------------------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------------------

    fn transition(&mut self, next: TrackStatus) -> Result<(), PipelineError> {
        let current = self
            .track
            .status()
            .ok_or(PipelineError::UnknownStatus {
                track_id: self.track.id,
                status_id: self.track.status_id,
            })?;
        if !current.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                track_id: self.track.id,
                from: current,
                to: next,
            });
        }
        tracing::debug!(track_id = self.track.id, from = %current, to = %next, "Track status change");
        self.track.set_status(next);
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), PipelineError> {
        self.track = self.store.update_track(&self.track).await?;
        Ok(())
    }

    /// Estimated seconds in the artifact at `path`; `None` when it is
    /// missing.
    async fn estimate_duration(&self, path: &Path) -> Option<f64> {
        let metadata = tokio::fs::metadata(path).await.ok()?;
        self.config
            .estimator
            .estimate_for_path(path, metadata.len())
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
