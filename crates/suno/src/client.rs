//! [`GenerationService`] backed by the Suno API.

use async_trait::async_trait;
use songbatch_core::artifact::ArtifactLocations;
use songbatch_core::duration::ArtifactKind;
use songbatch_core::naming;
use songbatch_pipeline::{
    ExtendRequest, GenerationError, GenerationOutput, GenerationRequest, GenerationService,
};

use crate::api::{ExtendBody, GenerateBody, SunoApi, SunoApiError};
use crate::config::SunoConfig;
use crate::messages::{self, ProviderTrack};
use crate::models::map_model;
use crate::poll;

/// Submit, poll and download against one Suno deployment.
pub struct SunoClient {
    api: SunoApi,
    config: SunoConfig,
}

impl SunoClient {
    pub fn new(config: SunoConfig) -> Self {
        Self {
            api: SunoApi::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &SunoConfig {
        &self.config
    }

    fn generate_body<'a>(&'a self, request: &'a GenerationRequest) -> GenerateBody<'a> {
        GenerateBody {
            prompt: &request.lyrics,
            custom_mode: true,
            style: &request.style,
            title: &request.title,
            instrumental: request.instrumental,
            model: map_model(&request.model),
            negative_tags: "",
            style_weight: self.config.style_weight,
            weirdness_constraint: self.config.weirdness_constraint,
            audio_weight: self.config.audio_weight,
            call_back_url: &self.config.callback_url,
        }
    }

    fn extend_body<'a>(&'a self, request: &'a ExtendRequest) -> ExtendBody<'a> {
        ExtendBody {
            audio_id: &request.generation_id,
            default_param_flag: true,
            prompt: "",
            model: map_model(&request.model),
            continue_at: None,
            call_back_url: Some(&self.config.callback_url),
        }
    }

    /// Wait for `task_id` and return its first track.
    async fn await_track(&self, task_id: &str) -> Result<ProviderTrack, SunoApiError> {
        let tracks = poll::wait_for_completion(
            &self.api,
            task_id,
            self.config.poll_interval,
            self.config.max_wait,
        )
        .await?;
        messages::first_track(&tracks)
    }

    async fn fetch(
        &self,
        track: ProviderTrack,
        file_name: String,
        kind: ArtifactKind,
    ) -> Result<GenerationOutput, SunoApiError> {
        let local_path = self.config.output_dir.join(file_name);
        self.api.download(&track.audio_url, &local_path).await?;
        Ok(GenerationOutput {
            generation_id: track.id,
            artifacts: ArtifactLocations {
                local_path,
                remote_url: Some(track.audio_url),
            },
            is_native_format: kind == ArtifactKind::Wav,
        })
    }

    async fn run_generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, SunoApiError> {
        let task_id = self.api.submit_generate(&self.generate_body(request)).await?;
        tracing::info!(task_id = %task_id, title = %request.title, "Submitted generation");

        let track = self.await_track(&task_id).await?;
        let kind = ArtifactKind::from_url(&track.audio_url);
        if kind != ArtifactKind::Wav && request.prefer_wav && !request.allow_mp3_to_wav {
            return Err(SunoApiError::Protocol(format!(
                "Provider returned a compressed artifact ({}) and MP3 fallback is disabled",
                track.audio_url
            )));
        }
        let file_name = naming::generated_filename(&track.id, kind);
        self.fetch(track, file_name, kind).await
    }

    async fn run_extend(&self, request: &ExtendRequest) -> Result<GenerationOutput, SunoApiError> {
        let task_id = self.api.submit_extend(&self.extend_body(request)).await?;
        tracing::info!(
            task_id = %task_id,
            generation_id = %request.generation_id,
            "Submitted extension"
        );

        let track = self.await_track(&task_id).await?;
        let kind = ArtifactKind::from_url(&track.audio_url);
        let file_name = naming::extension_filename(&track.id, kind);
        self.fetch(track, file_name, kind).await
    }
}

#[async_trait]
impl GenerationService for SunoClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationOutput, GenerationError> {
        self.run_generate(request).await.map_err(|e| match e {
            SunoApiError::Timeout { waited, .. } => GenerationError::Timeout(waited),
            other => GenerationError::Failure(other.to_string()),
        })
    }

    async fn extend(&self, request: &ExtendRequest) -> Result<GenerationOutput, GenerationError> {
        self.run_extend(request).await.map_err(|e| match e {
            SunoApiError::Timeout { waited, .. } => GenerationError::Timeout(waited),
            other => GenerationError::ExtensionFailure(other.to_string()),
        })
    }
}
