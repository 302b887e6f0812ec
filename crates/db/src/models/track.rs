//! Track entity model and DTO.

use std::collections::BTreeMap;

use serde::Serialize;
use songbatch_core::artifact::ArtifactLocations;
use songbatch_core::prompt::PromptDocument;
use songbatch_core::track_status::{StatusId, TrackStatus};
use songbatch_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

/// Provider generation ids keyed by `"initial"` / `"extend_N"`.
pub type GenerationIds = BTreeMap<String, String>;

/// Artifact locations keyed like [`GenerationIds`].
pub type ArtifactMap = BTreeMap<String, ArtifactLocations>;

/// A row from the `tracks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Track {
    pub id: DbId,
    pub batch_id: DbId,
    pub title: String,
    pub style: String,
    pub lyrics: String,
    pub model: String,
    pub status_id: StatusId,
    pub target_duration_secs: f64,
    /// Running estimate; `None` until an artifact was measured.
    pub final_duration_secs: Option<f64>,
    /// Whether the latest artifact is a native WAV.
    pub native_wav: bool,
    pub attempts: i32,
    pub extends_used: i32,
    pub generation_ids: Json<GenerationIds>,
    pub artifacts: Json<ArtifactMap>,
    /// Path served for download.
    pub file_path: Option<String>,
    pub submitted_at: Option<Timestamp>,
    pub generated_at: Option<Timestamp>,
    /// Wall-clock time the track reached a terminal status.
    pub completed_at: Option<Timestamp>,
    pub metadata: Json<serde_json::Map<String, serde_json::Value>>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Track {
    /// Decoded status, `None` for an id outside the lookup table.
    pub fn status(&self) -> Option<TrackStatus> {
        TrackStatus::from_id(self.status_id)
    }

    pub fn set_status(&mut self, status: TrackStatus) {
        self.status_id = status.id();
    }

    /// Most recent provider generation id: the highest extension, else the
    /// initial generation.
    pub fn latest_generation_id(&self) -> Option<&str> {
        let extends = u32::try_from(self.extends_used).unwrap_or(0);
        (1..=extends)
            .rev()
            .find_map(|n| {
                self.generation_ids
                    .get(&songbatch_core::track_events::extend_generation_key(n))
            })
            .or_else(|| {
                self.generation_ids
                    .get(songbatch_core::track_events::INITIAL_GENERATION_KEY)
            })
            .map(String::as_str)
    }

    /// Artifact segments in playback order: initial, then extensions.
    pub fn ordered_segments(&self) -> Vec<&ArtifactLocations> {
        let extends = u32::try_from(self.extends_used).unwrap_or(0);
        let initial = self
            .artifacts
            .get(songbatch_core::track_events::INITIAL_GENERATION_KEY);
        initial
            .into_iter()
            .chain((1..=extends).filter_map(|n| {
                self.artifacts
                    .get(&songbatch_core::track_events::extend_generation_key(n))
            }))
            .collect()
    }
}

/// DTO for creating a `submitted` track at intake.
#[derive(Debug, Clone)]
pub struct CreateTrack {
    pub title: String,
    pub style: String,
    pub lyrics: String,
    pub model: String,
    pub target_duration_secs: f64,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl CreateTrack {
    /// Build from a validated prompt and the batch's model and target.
    pub fn from_prompt(prompt: PromptDocument, model: &str, target_duration_secs: f64) -> Self {
        Self {
            title: prompt.title,
            style: prompt.style,
            lyrics: prompt.lyrics,
            model: model.to_string(),
            target_duration_secs,
            metadata: prompt.metadata,
        }
    }
}
