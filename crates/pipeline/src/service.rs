//! The generation service capability consumed by the track job.
//!
//! Implementations perform their own submit-and-poll cycle and leave a
//! downloaded artifact on disk before returning successfully. The job only
//! bounds each call with the batch's per-attempt timeout.

use std::time::Duration;

use async_trait::async_trait;
use songbatch_core::artifact::ArtifactLocations;

/// Inputs of one generation attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub title: String,
    pub style: String,
    pub lyrics: String,
    pub model: String,
    pub target_duration_secs: f64,
    pub prefer_wav: bool,
    /// Accept a compressed artifact when WAV is unavailable.
    pub allow_mp3_to_wav: bool,
    pub instrumental: bool,
}

/// Inputs of one extend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendRequest {
    /// Provider id of the generation being extended.
    pub generation_id: String,
    pub extension_secs: f64,
    pub prefer_wav: bool,
    pub model: String,
}

/// Result of a successful generate or extend call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutput {
    pub generation_id: String,
    pub artifacts: ArtifactLocations,
    /// `true` when the downloaded artifact is a WAV.
    pub is_native_format: bool,
}

/// Errors surfaced by a [`GenerationService`].
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The provider rejected or failed the generation.
    #[error("Generation failed: {0}")]
    Failure(String),

    /// No result within the allowed time.
    #[error("Generation timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// An extend call failed.
    #[error("Extension failed: {0}")]
    ExtensionFailure(String),
}

/// Asynchronous music generation with provider-side polling and download.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate a new track from a prompt.
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationOutput, GenerationError>;

    /// Append generated length to an existing generation.
    async fn extend(&self, request: &ExtendRequest) -> Result<GenerationOutput, GenerationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_reports_seconds() {
        let err = GenerationError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Generation timed out after 1.5s");
    }
}
