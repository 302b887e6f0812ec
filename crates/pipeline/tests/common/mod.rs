//! Shared fixtures for pipeline tests: a scripted generation service and
//! batch setup over the in-memory store.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use songbatch_core::artifact::ArtifactLocations;
use songbatch_core::batch::BatchParameters;
use songbatch_core::duration::{DurationEstimator, PcmFormat};
use songbatch_core::types::DbId;
use songbatch_db::models::batch::CreateBatch;
use songbatch_db::models::track::{CreateTrack, Track};
use songbatch_db::models::track_event::TrackEvent;
use songbatch_pipeline::{
    BatchCoordinator, ExtendRequest, GenerationError, GenerationOutput, GenerationRequest,
    GenerationService, MemoryTrackStore, PipelineConfig, TrackStore,
};

/// 100 bytes of PCM per second, so byte counts read as centiseconds.
pub const BYTES_PER_SECOND: usize = 100;

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    /// Write `secs` worth of raw bytes and succeed.
    Ok { secs: usize },
    /// Write a real WAV file with `secs` worth of 8-bit mono samples.
    Wav { secs: usize },
    /// Succeed with an artifact path that does not exist.
    Missing,
    /// Fail with the given detail.
    Fail(&'static str),
    /// Never return.
    Hang,
    /// Panic inside the job.
    Panic,
}

/// Generation service replaying scripted steps in call order.
///
/// Calls beyond the script succeed with [`ScriptedService::default_secs`].
pub struct ScriptedService {
    dir: PathBuf,
    generate: Mutex<VecDeque<Step>>,
    extend: Mutex<VecDeque<Step>>,
    pub default_secs: usize,
    pub delay: Duration,
    next_id: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub extend_calls: AtomicUsize,
    pub extend_requests: Mutex<Vec<ExtendRequest>>,
}

impl ScriptedService {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            generate: Mutex::new(VecDeque::new()),
            extend: Mutex::new(VecDeque::new()),
            default_secs: 400,
            delay: Duration::ZERO,
            next_id: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            extend_calls: AtomicUsize::new(0),
            extend_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_generate(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.generate.lock().unwrap().extend(steps);
        self
    }

    pub fn with_extend(self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.extend.lock().unwrap().extend(steps);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn play(
        &self,
        script: &Mutex<VecDeque<Step>>,
        suffix: &str,
    ) -> Result<GenerationOutput, String> {
        let step = script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Ok {
                secs: self.default_secs,
            });

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.produce(step, suffix).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn produce(&self, step: Step, suffix: &str) -> Result<GenerationOutput, String> {
        let id = format!("gen_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let path = self.dir.join(format!("{id}{suffix}.wav"));
        match step {
            Step::Ok { secs } => {
                std::fs::write(&path, vec![0u8; secs * BYTES_PER_SECOND]).unwrap();
            }
            Step::Wav { secs } => write_wav(&path, secs),
            Step::Missing => {}
            Step::Fail(detail) => return Err(detail.to_string()),
            Step::Hang => std::future::pending::<()>().await,
            Step::Panic => panic!("scripted panic"),
        }
        Ok(GenerationOutput {
            generation_id: id,
            artifacts: ArtifactLocations {
                local_path: path,
                remote_url: None,
            },
            is_native_format: true,
        })
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.play(&self.generate, "")
            .await
            .map_err(GenerationError::Failure)
    }

    async fn extend(&self, request: &ExtendRequest) -> Result<GenerationOutput, GenerationError> {
        self.extend_calls.fetch_add(1, Ordering::SeqCst);
        self.extend_requests.lock().unwrap().push(request.clone());
        self.play(&self.extend, "_ext")
            .await
            .map_err(GenerationError::ExtensionFailure)
    }
}

/// Mono 8-bit WAV at `BYTES_PER_SECOND` Hz.
pub fn write_wav(path: &Path, secs: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: BYTES_PER_SECOND as u32,
        bits_per_sample: 8,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..secs * BYTES_PER_SECOND {
        writer.write_sample((i % 64) as i8).unwrap();
    }
    writer.finalize().unwrap();
}

/// Pipeline settings matching [`BYTES_PER_SECOND`], no retry delay, no
/// stitching.
pub fn test_config(output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        retry_delay: Duration::ZERO,
        stitch_extensions: false,
        estimator: DurationEstimator {
            pcm: PcmFormat {
                sample_rate: BYTES_PER_SECOND as u32,
                bytes_per_sample: 1,
                channels: 1,
            },
            compressed_bitrate_kbps: 8,
        },
        output_dir: output_dir.to_path_buf(),
    }
}

pub fn params() -> BatchParameters {
    BatchParameters {
        target_duration_secs: 240.0,
        extend_enabled: false,
        retries: 3,
        concurrency: 2,
        timeout_secs: 5.0,
        ..BatchParameters::default()
    }
}

/// Store holding one batch with `count` submitted tracks.
pub async fn seed_batch(params: &BatchParameters, count: usize) -> (Arc<MemoryTrackStore>, DbId) {
    let store = Arc::new(MemoryTrackStore::new());
    let tracks: Vec<CreateTrack> = (0..count)
        .map(|i| CreateTrack {
            title: format!("Song {i}"),
            style: "synthwave".to_string(),
            lyrics: format!("Song {i}\nla la la"),
            model: params.model.clone(),
            target_duration_secs: params.target_duration_secs,
            metadata: serde_json::Map::new(),
        })
        .collect();
    let (batch, _) = store
        .create_batch(
            &CreateBatch {
                parameters: params.clone(),
                initiator: Some("tests".to_string()),
            },
            &tracks,
        )
        .await
        .unwrap();
    (store, batch.id)
}

pub fn coordinator(
    store: Arc<MemoryTrackStore>,
    service: Arc<ScriptedService>,
    config: PipelineConfig,
) -> BatchCoordinator {
    BatchCoordinator::new(store, service, config)
}

pub async fn only_track(store: &MemoryTrackStore, batch_id: DbId) -> Track {
    let mut tracks = store.list_tracks(batch_id).await.unwrap();
    assert_eq!(tracks.len(), 1);
    tracks.remove(0)
}

pub async fn stages(store: &MemoryTrackStore, track_id: DbId) -> Vec<String> {
    events(store, track_id)
        .await
        .into_iter()
        .map(|e| e.stage)
        .collect()
}

pub async fn events(store: &MemoryTrackStore, track_id: DbId) -> Vec<TrackEvent> {
    store.list_events(track_id).await.unwrap()
}

pub fn count(stages: &[String], stage: &str) -> usize {
    stages.iter().filter(|s| *s == stage).count()
}
