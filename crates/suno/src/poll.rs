//! Task polling with a bounded wait.

use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::api::{SunoApi, SunoApiError};
use crate::messages::{self, TaskState};

/// Poll `record-info` every `interval` until the task succeeds, fails, or
/// `max_wait` elapses. Returns the completed task's raw track list.
///
/// Transport errors and non-2xx responses during polling are logged and
/// retried; only a reported failure or the deadline ends the wait early.
pub async fn wait_for_completion(
    api: &SunoApi,
    task_id: &str,
    interval: Duration,
    max_wait: Duration,
) -> Result<Vec<Value>, SunoApiError> {
    let started = Instant::now();
    let mut polls = 0u32;

    loop {
        polls += 1;
        match api
            .record_info(task_id)
            .await
            .and_then(|body| messages::parse_record_info(&body))
        {
            Ok(TaskState::Succeeded(tracks)) => {
                tracing::debug!(task_id, polls, tracks = tracks.len(), "Task completed");
                return Ok(tracks);
            }
            Ok(TaskState::Failed { status, message }) => {
                return Err(SunoApiError::TaskFailed { status, message });
            }
            Ok(TaskState::Pending(status)) => {
                tracing::debug!(task_id, polls, status = status.as_deref(), "Task pending");
            }
            Err(e) => {
                tracing::warn!(task_id, polls, error = %e, "Error while polling task status");
            }
        }

        if started.elapsed() + interval >= max_wait {
            return Err(SunoApiError::Timeout {
                task_id: task_id.to_string(),
                waited: max_wait,
            });
        }
        tokio::time::sleep(interval).await;
    }
}
