//! Normalization of Suno API responses.
//!
//! Response shapes vary between API versions: task ids appear as `taskId`
//! or `task_id`, completed tracks under `data`, `tracks` or `sunoData` as a
//! list or a single object, and track fields in camelCase or snake_case.
//! Everything is reduced to the fixed types in this module.

use serde_json::Value;

use crate::api::SunoApiError;

/// Task states reported as final failures.
const FAILURE_STATES: &[&str] = &["FAILURE", "FAILED", "ERROR"];

/// Task state reported on completion.
const SUCCESS_STATE: &str = "SUCCESS";

/// One generated clip of a completed task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTrack {
    pub id: String,
    pub audio_url: String,
}

/// Polling result for a submitted task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState {
    /// Still running; carries the reported status, if any.
    Pending(Option<String>),
    /// Finished; tracks in provider order.
    Succeeded(Vec<Value>),
    Failed { status: String, message: String },
}

/// Extract the task id from a submit response (`{code, msg, data: {taskId}}`).
pub fn parse_task_id(body: &Value) -> Result<String, SunoApiError> {
    body.get("data")
        .and_then(|data| first_str(data, &["taskId", "task_id"]))
        .map(str::to_owned)
        .ok_or_else(|| SunoApiError::Protocol(format!("Task id not found in response: {body}")))
}

/// Interpret a `record-info` response.
pub fn parse_record_info(body: &Value) -> Result<TaskState, SunoApiError> {
    let info = body.get("data").unwrap_or(&Value::Null);
    let status = info.get("status").and_then(Value::as_str);

    match status {
        Some(SUCCESS_STATE) => {
            let response = info.get("response").unwrap_or(&Value::Null);
            let tracks = ["data", "tracks", "sunoData"]
                .iter()
                .filter_map(|key| response.get(*key))
                .find(|v| is_present(v))
                .cloned()
                .unwrap_or(Value::Array(Vec::new()));
            match tracks {
                Value::Array(list) => Ok(TaskState::Succeeded(list)),
                object @ Value::Object(_) => Ok(TaskState::Succeeded(vec![object])),
                other => Err(SunoApiError::Protocol(format!(
                    "Unexpected track list in completed task: {other}"
                ))),
            }
        }
        Some(s) if FAILURE_STATES.contains(&s) => {
            let message = info
                .get("msg")
                .or_else(|| body.get("msg"))
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("unknown error");
            Ok(TaskState::Failed {
                status: s.to_string(),
                message: message.to_string(),
            })
        }
        other => Ok(TaskState::Pending(other.map(str::to_owned))),
    }
}

/// Reduce the first completed track to its id and audio URL.
pub fn first_track(tracks: &[Value]) -> Result<ProviderTrack, SunoApiError> {
    let track = tracks
        .first()
        .ok_or_else(|| SunoApiError::Protocol("No tracks returned on completion".to_string()))?;
    let id = first_str(track, &["id", "audioId", "audio_id"]);
    let audio_url = first_str(track, &["audioUrl", "audio_url", "url", "streamAudioUrl"]);
    match (id, audio_url) {
        (Some(id), Some(audio_url)) => Ok(ProviderTrack {
            id: id.to_string(),
            audio_url: audio_url.to_string(),
        }),
        _ => Err(SunoApiError::Protocol(format!(
            "Incomplete track information: {track}"
        ))),
    }
}

/// First non-empty string among `keys`.
fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Nulls and empty containers count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
