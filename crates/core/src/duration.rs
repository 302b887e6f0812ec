//! Duration estimation from artifact byte size.
//!
//! Durations are estimates, not measurements: the provider's artifacts are
//! never decoded. WAV artifacts are treated as raw PCM at the configured
//! format; compressed artifacts at a fixed bitrate.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default PCM sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Default PCM sample width in bytes (16-bit).
pub const DEFAULT_BYTES_PER_SAMPLE: u32 = 2;
/// Default PCM channel count.
pub const DEFAULT_CHANNELS: u32 = 1;
/// Default bitrate assumed for compressed artifacts.
pub const DEFAULT_COMPRESSED_BITRATE_KBPS: u32 = 128;

/// Container kind of a downloaded artifact, decided by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Wav,
    Mp3,
}

impl ArtifactKind {
    /// `.wav` (any case) is WAV; everything else is treated as MP3.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wav") => Self::Wav,
            _ => Self::Mp3,
        }
    }

    /// Same rule applied to a provider URL.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path.to_ascii_lowercase().ends_with(".wav") {
            Self::Wav
        } else {
            Self::Mp3
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp3 => "audio/mpeg",
        }
    }
}

/// PCM layout assumed for WAV artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bytes_per_sample: u32,
    pub channels: u32,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bytes_per_sample: DEFAULT_BYTES_PER_SAMPLE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl PcmFormat {
    pub fn bytes_per_second(&self) -> f64 {
        f64::from(self.sample_rate) * f64::from(self.bytes_per_sample) * f64::from(self.channels)
    }
}

/// Constants used to turn a byte size into seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationEstimator {
    pub pcm: PcmFormat,
    pub compressed_bitrate_kbps: u32,
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self {
            pcm: PcmFormat::default(),
            compressed_bitrate_kbps: DEFAULT_COMPRESSED_BITRATE_KBPS,
        }
    }
}

impl DurationEstimator {
    /// Estimate seconds of audio in `byte_size` bytes of `kind`.
    ///
    /// Returns `None` when the configured rate is zero.
    pub fn estimate(&self, byte_size: u64, kind: ArtifactKind) -> Option<f64> {
        let rate = match kind {
            ArtifactKind::Wav => self.pcm.bytes_per_second(),
            ArtifactKind::Mp3 => f64::from(self.compressed_bitrate_kbps) * 1000.0 / 8.0,
        };
        if rate <= 0.0 {
            return None;
        }
        Some(byte_size as f64 / rate)
    }

    /// Estimate using the kind implied by the artifact path.
    pub fn estimate_for_path(&self, path: &Path, byte_size: u64) -> Option<f64> {
        self.estimate(byte_size, ArtifactKind::from_path(path))
    }
}
