//! Handlers for the `/batches` resource: intake and batch status.
//!
//! Intake validates every prompt document and the batch parameters before
//! anything is persisted, so a single bad file rejects the whole request.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use songbatch_core::batch::{
    infer_batch_status, validate_batch_parameters, BatchParameters, BatchStatus,
};
use songbatch_core::prompt::{parse_prompt_document, prompt_from_value, PromptDocument};
use songbatch_core::types::DbId;
use songbatch_db::models::batch::{Batch, CreateBatch};
use songbatch_db::models::track::{CreateTrack, Track};

use crate::error::{AppError, AppResult};
use crate::handlers::tracks::TrackView;
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying prompt files.
const FILES_FIELD: &str = "files";
/// Multipart field naming who started the batch.
const INITIATOR_FIELD: &str = "initiator";
/// Multipart field carrying all parameters as one JSON object.
const PARAMETERS_FIELD: &str = "parameters";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/batches/json`.
#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    #[serde(default)]
    pub parameters: BatchParameters,
    #[serde(default)]
    pub initiator: Option<String>,
    /// Prompt documents, validated like uploaded files.
    pub prompts: Vec<Value>,
}

/// A batch with its derived status and tracks.
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub status: BatchStatus,
    pub tracks: Vec<TrackView>,
}

impl BatchDetail {
    fn new(batch: Batch, tracks: Vec<Track>) -> Self {
        let statuses: Vec<_> = tracks.iter().filter_map(Track::status).collect();
        Self {
            batch,
            status: infer_batch_status(&statuses),
            tracks: tracks.into_iter().map(TrackView::from).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

/// POST /api/v1/batches
///
/// Multipart intake: one or more prompt files under `files`, plus optional
/// parameter fields (`model`, `concurrency`, ...) or a single `parameters`
/// JSON field. Returns 201 with the batch and its tracks and schedules
/// processing.
pub async fn create_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<BatchDetail>>)> {
    let mut prompts = Vec::new();
    let mut fields = Map::new();
    let mut initiator = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);

        if name == FILES_FIELD || file_name.is_some() {
            let source = file_name.unwrap_or_else(|| format!("#{}", prompts.len() + 1));
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            prompts.push(parse_prompt_document(&source, &bytes)?);
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        match name.as_str() {
            INITIATOR_FIELD => {
                initiator = Some(text.trim().to_string()).filter(|s| !s.is_empty());
            }
            PARAMETERS_FIELD => match serde_json::from_str(&text) {
                Ok(Value::Object(object)) => fields.extend(object),
                _ => {
                    return Err(AppError::BadRequest(
                        "Field 'parameters' must be a JSON object".to_string(),
                    ))
                }
            },
            other => {
                let key = canonical_parameter(other);
                fields.insert(key.to_string(), form_value(key, &text));
            }
        }
    }

    let parameters: BatchParameters = serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::BadRequest(format!("Invalid batch parameters: {e}")))?;

    let detail = intake(&state, parameters, initiator, prompts).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// POST /api/v1/batches/json
///
/// Same intake as [`create_batch`] with prompt documents inline.
pub async fn create_batch_json(
    State(state): State<AppState>,
    Json(input): Json<CreateBatchRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<BatchDetail>>)> {
    let prompts = input
        .prompts
        .into_iter()
        .enumerate()
        .map(|(i, value)| prompt_from_value(&format!("prompts[{i}]"), value))
        .collect::<Result<Vec<_>, _>>()?;

    let detail = intake(&state, input.parameters, input.initiator, prompts).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// Validate, persist the batch with its tracks, and schedule processing.
async fn intake(
    state: &AppState,
    parameters: BatchParameters,
    initiator: Option<String>,
    prompts: Vec<PromptDocument>,
) -> AppResult<BatchDetail> {
    validate_batch_parameters(&parameters)?;
    if prompts.is_empty() {
        return Err(AppError::BadRequest(
            "At least one prompt document is required".to_string(),
        ));
    }

    let tracks: Vec<CreateTrack> = prompts
        .into_iter()
        .map(|prompt| {
            CreateTrack::from_prompt(prompt, &parameters.model, parameters.target_duration_secs)
        })
        .collect();
    let (batch, tracks) = state
        .store
        .create_batch(
            &CreateBatch {
                parameters,
                initiator,
            },
            &tracks,
        )
        .await?;

    tracing::info!(
        batch_id = batch.id,
        tracks = tracks.len(),
        initiator = batch.initiator.as_deref(),
        "Batch created",
    );
    state.coordinator.start_batch_processing(batch.id);

    Ok(BatchDetail::new(batch, tracks))
}

/// Map legacy form field names onto [`BatchParameters`] fields.
fn canonical_parameter(name: &str) -> &str {
    match name {
        "modelo" => "model",
        "duracao_alvo" | "target_duration" => "target_duration_secs",
        "timeout" => "timeout_secs",
        other => other,
    }
}

/// Interpret a form value: booleans in their usual spellings, numbers as
/// numbers, `model` always as text.
fn form_value(key: &str, text: &str) -> Value {
    let text = text.trim();
    if key == "model" {
        return Value::String(text.to_string());
    }
    match text.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => Value::Bool(true),
        "false" | "off" | "no" => Value::Bool(false),
        _ => serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/batches/{id}
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<BatchDetail>>> {
    let batch = state.store.fetch_batch(id).await?;
    let tracks = state.store.list_tracks(id).await?;
    Ok(Json(DataResponse {
        data: BatchDetail::new(batch, tracks),
    }))
}
