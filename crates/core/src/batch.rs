//! Batch generation parameters, their defaults and validation, and the
//! on-demand batch status derived from member tracks.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::track_status::TrackStatus;

// ---------------------------------------------------------------------------
// Defaults and limits
// ---------------------------------------------------------------------------

/// Model used when the request does not name one.
pub const DEFAULT_MODEL: &str = "v4.5";
/// Models offered to clients.
pub const AVAILABLE_MODELS: &[&str] = &["v4.5", "v5"];

/// Default target duration per track in seconds.
pub const DEFAULT_TARGET_DURATION_SECS: f64 = 360.0;
/// Default maximum number of extend calls per track.
pub const DEFAULT_EXTENDS_MAX: u32 = 2;
/// Default number of tracks generating at once.
pub const DEFAULT_CONCURRENCY: u32 = 2;
/// Default number of generation attempts per track.
pub const DEFAULT_RETRIES: u32 = 3;
/// Default per-attempt timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: f64 = 480.0;

/// Upper bound on the per-attempt timeout in seconds (one day).
pub const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Inclusive bounds on batch concurrency.
pub const MIN_CONCURRENCY: u32 = 1;
pub const MAX_CONCURRENCY: u32 = 4;

/// Inclusive bounds on the attempt budget.
pub const MIN_RETRIES: u32 = 1;
pub const MAX_RETRIES: u32 = 10;

/// Upper bound on extend calls a batch may request.
pub const MAX_EXTENDS: u32 = 10;

/// Length requested from the provider on every extend call, in seconds.
pub const EXTENSION_INCREMENT_SECS: f64 = 60.0;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Generation parameters shared by every track of a batch.
///
/// Stored as JSONB on the batch row. Once processing starts the coordinator
/// loads one snapshot and every track job reads that same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchParameters {
    pub model: String,
    pub prefer_wav: bool,
    /// Accept a compressed artifact when the provider cannot produce WAV.
    pub allow_mp3_to_wav: bool,
    pub instrumental: bool,
    pub target_duration_secs: f64,
    pub extend_enabled: bool,
    pub extends_max: u32,
    pub concurrency: u32,
    pub retries: u32,
    pub timeout_secs: f64,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            prefer_wav: true,
            allow_mp3_to_wav: true,
            instrumental: false,
            target_duration_secs: DEFAULT_TARGET_DURATION_SECS,
            extend_enabled: true,
            extends_max: DEFAULT_EXTENDS_MAX,
            concurrency: DEFAULT_CONCURRENCY,
            retries: DEFAULT_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BatchParameters {
    /// Per-attempt deadline for generate and extend calls.
    ///
    /// Values above `MAX_TIMEOUT_SECS` are capped; unusable values fall back
    /// to `DEFAULT_TIMEOUT_SECS`.
    pub fn attempt_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.min(MAX_TIMEOUT_SECS))
            .unwrap_or(Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Concurrency clamped into the supported range.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY) as usize
    }
}

/// Validate batch parameters before anything is persisted.
///
/// Rules:
/// - `model` must not be blank.
/// - `concurrency` within `MIN_CONCURRENCY..=MAX_CONCURRENCY`.
/// - `retries` within `MIN_RETRIES..=MAX_RETRIES`.
/// - `extends_max` at most `MAX_EXTENDS`.
/// - `target_duration_secs` and `timeout_secs` finite and positive.
/// - `timeout_secs` at most `MAX_TIMEOUT_SECS`.
pub fn validate_batch_parameters(params: &BatchParameters) -> Result<(), CoreError> {
    if params.model.trim().is_empty() {
        return Err(CoreError::Validation("Model must not be empty".to_string()));
    }
    if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&params.concurrency) {
        return Err(CoreError::Validation(format!(
            "Concurrency must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
        )));
    }
    if !(MIN_RETRIES..=MAX_RETRIES).contains(&params.retries) {
        return Err(CoreError::Validation(format!(
            "Retries must be between {MIN_RETRIES} and {MAX_RETRIES}"
        )));
    }
    if params.extends_max > MAX_EXTENDS {
        return Err(CoreError::Validation(format!(
            "extends_max must not exceed {MAX_EXTENDS}"
        )));
    }
    if !params.target_duration_secs.is_finite() || params.target_duration_secs <= 0.0 {
        return Err(CoreError::Validation(
            "target_duration_secs must be positive".to_string(),
        ));
    }
    if !params.timeout_secs.is_finite() || params.timeout_secs <= 0.0 {
        return Err(CoreError::Validation(
            "timeout_secs must be positive".to_string(),
        ));
    }
    if params.timeout_secs > MAX_TIMEOUT_SECS {
        return Err(CoreError::Validation(format!(
            "timeout_secs must not exceed {MAX_TIMEOUT_SECS}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch status
// ---------------------------------------------------------------------------

/// Batch-level status. Never stored; derived from member tracks on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// No track has started (or the batch is empty).
    Pending,
    /// At least one track started and at least one is not terminal.
    Processing,
    /// Every track finalized.
    Completed,
    /// Every track is terminal, some finalized and some errored.
    CompletedWithErrors,
    /// Every track errored.
    Failed,
}

/// Derive the batch status from its tracks' statuses.
pub fn infer_batch_status(statuses: &[TrackStatus]) -> BatchStatus {
    if statuses.iter().all(|s| *s == TrackStatus::Submitted) {
        return BatchStatus::Pending;
    }
    if statuses.iter().any(|s| !s.is_terminal()) {
        return BatchStatus::Processing;
    }

    let errors = statuses
        .iter()
        .filter(|s| **s == TrackStatus::Error)
        .count();
    match errors {
        0 => BatchStatus::Completed,
        n if n == statuses.len() => BatchStatus::Failed,
        _ => BatchStatus::CompletedWithErrors,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate_batch_parameters(&BatchParameters::default()).is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let params: BatchParameters =
            serde_json::from_str(r#"{"model": "v5", "concurrency": 4}"#).unwrap();
        assert_eq!(params.model, "v5");
        assert_eq!(params.concurrency, 4);
        assert_eq!(params.retries, DEFAULT_RETRIES);
        assert_eq!(params.target_duration_secs, DEFAULT_TARGET_DURATION_SECS);
    }

    #[test]
    fn concurrency_outside_range_is_rejected() {
        for concurrency in [0, 5] {
            let params = BatchParameters {
                concurrency,
                ..Default::default()
            };
            assert_matches!(
                validate_batch_parameters(&params),
                Err(CoreError::Validation(msg)) if msg.contains("Concurrency")
            );
        }
    }

    #[test]
    fn zero_retries_is_rejected() {
        let params = BatchParameters {
            retries: 0,
            ..Default::default()
        };
        assert_matches!(validate_batch_parameters(&params), Err(CoreError::Validation(_)));
    }

    #[test]
    fn non_positive_durations_are_rejected() {
        let params = BatchParameters {
            target_duration_secs: 0.0,
            ..Default::default()
        };
        assert!(validate_batch_parameters(&params).is_err());

        let params = BatchParameters {
            timeout_secs: f64::NAN,
            ..Default::default()
        };
        assert!(validate_batch_parameters(&params).is_err());
    }

    #[test]
    fn blank_model_is_rejected() {
        let params = BatchParameters {
            model: "  ".to_string(),
            ..Default::default()
        };
        assert!(validate_batch_parameters(&params).is_err());
    }

    #[test]
    fn effective_concurrency_is_clamped() {
        let params = BatchParameters {
            concurrency: 9,
            ..Default::default()
        };
        assert_eq!(params.effective_concurrency(), 4);
        let params = BatchParameters {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(params.effective_concurrency(), 1);
    }

    #[test]
    fn attempt_timeout_uses_fractional_seconds() {
        let params = BatchParameters {
            timeout_secs: 1.5,
            ..Default::default()
        };
        assert_eq!(params.attempt_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn timeout_above_cap_is_rejected() {
        let params = BatchParameters {
            timeout_secs: 1e20,
            ..Default::default()
        };
        assert_matches!(
            validate_batch_parameters(&params),
            Err(CoreError::Validation(msg)) if msg.contains("timeout_secs")
        );

        let params = BatchParameters {
            timeout_secs: MAX_TIMEOUT_SECS,
            ..Default::default()
        };
        assert!(validate_batch_parameters(&params).is_ok());
    }

    #[test]
    fn attempt_timeout_never_panics_on_unvalidated_values() {
        let huge = BatchParameters {
            timeout_secs: 1e20,
            ..Default::default()
        };
        assert_eq!(
            huge.attempt_timeout(),
            Duration::from_secs_f64(MAX_TIMEOUT_SECS)
        );
        let negative = BatchParameters {
            timeout_secs: -1.0,
            ..Default::default()
        };
        assert_eq!(
            negative.attempt_timeout(),
            Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS)
        );
    }

    // -- Batch status --

    #[test]
    fn empty_or_untouched_batch_is_pending() {
        assert_eq!(infer_batch_status(&[]), BatchStatus::Pending);
        assert_eq!(
            infer_batch_status(&[TrackStatus::Submitted, TrackStatus::Submitted]),
            BatchStatus::Pending
        );
    }

    #[test]
    fn any_running_track_means_processing() {
        assert_eq!(
            infer_batch_status(&[TrackStatus::Finalized, TrackStatus::Submitted]),
            BatchStatus::Processing
        );
        assert_eq!(
            infer_batch_status(&[TrackStatus::Extending]),
            BatchStatus::Processing
        );
    }

    #[test]
    fn terminal_batches_are_classified() {
        assert_eq!(
            infer_batch_status(&[TrackStatus::Finalized, TrackStatus::Finalized]),
            BatchStatus::Completed
        );
        assert_eq!(
            infer_batch_status(&[TrackStatus::Finalized, TrackStatus::Error]),
            BatchStatus::CompletedWithErrors
        );
        assert_eq!(
            infer_batch_status(&[TrackStatus::Error, TrackStatus::Error]),
            BatchStatus::Failed
        );
    }
}
