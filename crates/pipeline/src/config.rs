use std::path::PathBuf;
use std::time::Duration;

use songbatch_core::duration::{
    DurationEstimator, PcmFormat, DEFAULT_BYTES_PER_SAMPLE, DEFAULT_CHANNELS,
    DEFAULT_COMPRESSED_BITRATE_KBPS, DEFAULT_SAMPLE_RATE,
};

/// Default pause between failed generation attempts.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Default directory for downloaded and stitched artifacts.
pub const DEFAULT_OUTPUT_DIR: &str = "./generated_audio";

/// Process-wide settings for track jobs.
///
/// Per-batch knobs (retries, timeout, extend budget) live in
/// `BatchParameters`; these apply to every batch.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Pause after a failed attempt. Skipped after the last attempt.
    pub retry_delay: Duration,
    /// Concatenate WAV segments after extension.
    pub stitch_extensions: bool,
    pub estimator: DurationEstimator,
    /// Where stitched artifacts are written.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            stitch_extensions: true,
            estimator: DurationEstimator::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default               |
    /// |---------------------------|-----------------------|
    /// | `RETRY_DELAY_SECS`        | `5`                   |
    /// | `STITCH_EXTENSIONS`       | `true`                |
    /// | `WAV_SAMPLE_RATE`         | `44100`               |
    /// | `WAV_BYTES_PER_SAMPLE`    | `2`                   |
    /// | `WAV_CHANNELS`            | `1`                   |
    /// | `COMPRESSED_BITRATE_KBPS` | `128`                 |
    /// | `OUTPUT_DIR`              | `./generated_audio`   |
    pub fn from_env() -> Self {
        let retry_delay_secs: u64 = env_or("RETRY_DELAY_SECS", DEFAULT_RETRY_DELAY_SECS);

        let stitch_extensions = std::env::var("STITCH_EXTENSIONS")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        let estimator = DurationEstimator {
            pcm: PcmFormat {
                sample_rate: env_or("WAV_SAMPLE_RATE", DEFAULT_SAMPLE_RATE),
                bytes_per_sample: env_or("WAV_BYTES_PER_SAMPLE", DEFAULT_BYTES_PER_SAMPLE),
                channels: env_or("WAV_CHANNELS", DEFAULT_CHANNELS),
            },
            compressed_bitrate_kbps: env_or(
                "COMPRESSED_BITRATE_KBPS",
                DEFAULT_COMPRESSED_BITRATE_KBPS,
            ),
        };

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Self {
            retry_delay: Duration::from_secs(retry_delay_secs),
            stitch_extensions,
            estimator,
            output_dir,
        }
    }
}

/// Parse `key`, falling back to `default` when unset or malformed.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring malformed setting");
            default
        }),
        Err(_) => default,
    }
}
