//! Offline [`GenerationService`] that synthesizes WAV noise.
//!
//! Used when no provider credentials are configured, and in local
//! development. Each call sleeps a random delay and writes a 16-bit mono
//! WAV of low-amplitude noise.

use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use songbatch_core::artifact::ArtifactLocations;
use songbatch_core::duration::{ArtifactKind, DEFAULT_SAMPLE_RATE};
use songbatch_core::naming;
use songbatch_pipeline::{
    ExtendRequest, GenerationError, GenerationOutput, GenerationRequest, GenerationService,
};

/// Peak amplitude of the generated noise, as a fraction of full scale.
const NOISE_AMPLITUDE: f64 = 0.1;

/// Fraction of the target duration a stub generation produces.
const LENGTH_FRACTION: Range<f64> = 0.6..1.0;

pub struct StubGenerationService {
    output_dir: PathBuf,
    sample_rate: u32,
    generate_delay: Range<Duration>,
    extend_delay: Range<Duration>,
}

impl StubGenerationService {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            generate_delay: Duration::from_secs(1)..Duration::from_secs(3),
            extend_delay: Duration::from_millis(500)..Duration::from_millis(1500),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Use the same simulated latency range for generate and extend.
    pub fn with_delay(mut self, delay: Range<Duration>) -> Self {
        self.generate_delay = delay.clone();
        self.extend_delay = delay;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn synthesize(
        &self,
        generation_id: String,
        seconds: f64,
    ) -> Result<GenerationOutput, String> {
        let local_path = self
            .output_dir
            .join(naming::generated_filename(&generation_id, ArtifactKind::Wav));
        let path = local_path.clone();
        let sample_rate = self.sample_rate;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| format!("Failed to create output directory: {e}"))?;
        tokio::task::spawn_blocking(move || write_noise(&path, seconds, sample_rate))
            .await
            .map_err(|e| format!("Stub writer task failed: {e}"))?
            .map_err(|e| format!("Failed to write stub audio: {e}"))?;

        tracing::debug!(
            generation_id = %generation_id,
            seconds,
            path = %local_path.display(),
            "Wrote stub audio"
        );
        Ok(GenerationOutput {
            generation_id,
            artifacts: ArtifactLocations {
                local_path,
                remote_url: None,
            },
            is_native_format: true,
        })
    }
}

#[async_trait]
impl GenerationService for StubGenerationService {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        let (delay, seconds, generation_id) = {
            let mut rng = rand::rng();
            (
                random_delay(&mut rng, &self.generate_delay),
                request.target_duration_secs * rng.random_range(LENGTH_FRACTION),
                format!("fake_{}", rng.random_range(100_000..1_000_000)),
            )
        };
        tokio::time::sleep(delay).await;

        self.synthesize(generation_id, seconds)
            .await
            .map_err(GenerationError::Failure)
    }

    async fn extend(&self, request: &ExtendRequest) -> Result<GenerationOutput, GenerationError> {
        let (delay, generation_id) = {
            let mut rng = rand::rng();
            (
                random_delay(&mut rng, &self.extend_delay),
                format!(
                    "{}_ext_{}",
                    request.generation_id,
                    rng.random_range(1000..10_000)
                ),
            )
        };
        tokio::time::sleep(delay).await;

        self.synthesize(generation_id, request.extension_secs)
            .await
            .map_err(GenerationError::ExtensionFailure)
    }
}

fn random_delay(rng: &mut impl Rng, range: &Range<Duration>) -> Duration {
    if range.is_empty() {
        return range.start;
    }
    rng.random_range(range.clone())
}

/// Write `seconds` of 16-bit mono noise at `sample_rate` to `path`.
fn write_noise(path: &Path, seconds: f64, sample_rate: u32) -> Result<(), hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let samples = (seconds.max(0.0) * f64::from(sample_rate)).round() as u64;
    let peak = (NOISE_AMPLITUDE * f64::from(i16::MAX)) as i16;

    let mut rng = rand::rng();
    let mut writer = hound::WavWriter::create(path, spec)?;
    for _ in 0..samples {
        writer.write_sample(rng.random_range(-peak..=peak))?;
    }
    writer.finalize()
}
