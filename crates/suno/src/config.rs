use std::path::PathBuf;
use std::time::Duration;

/// Default Suno API base URL.
pub const DEFAULT_API_URL: &str = "https://api.sunoapi.org/api/v1";

/// Default callback URL. The provider requires one even when results are
/// polled.
pub const DEFAULT_CALLBACK_URL: &str = "http://localhost:8000/suno-callback";

/// Default weight sent for `styleWeight`, `weirdnessConstraint` and
/// `audioWeight`.
pub const DEFAULT_WEIGHT: f64 = 0.65;

/// Which generation service the server wires into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationBackend {
    Suno,
    Stub,
}

impl GenerationBackend {
    /// `GENERATION_BACKEND` (`suno` | `stub`); without it, `suno` when an
    /// API key is configured and `stub` otherwise.
    pub fn from_env(config: &SunoConfig) -> Self {
        match std::env::var("GENERATION_BACKEND")
            .map(|v| v.trim().to_ascii_lowercase())
            .as_deref()
        {
            Ok("suno") => Self::Suno,
            Ok("stub") => Self::Stub,
            Ok(other) => {
                tracing::warn!(backend = other, "Unknown GENERATION_BACKEND, using stub");
                Self::Stub
            }
            Err(_) if config.api_key.is_some() => Self::Suno,
            Err(_) => Self::Stub,
        }
    }
}

/// Suno client configuration, injected at construction.
#[derive(Debug, Clone)]
pub struct SunoConfig {
    /// Base URL without trailing slash.
    pub api_url: String,
    /// Bearer token; requests are sent unauthenticated when absent.
    pub api_key: Option<String>,
    /// Directory downloaded artifacts are written to.
    pub output_dir: PathBuf,
    pub poll_interval: Duration,
    /// Upper bound on polling one task.
    pub max_wait: Duration,
    pub callback_url: String,
    pub style_weight: f64,
    pub weirdness_constraint: f64,
    pub audio_weight: f64,
    /// Timeout of the submit requests themselves.
    pub submit_timeout: Duration,
}

impl Default for SunoConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            output_dir: PathBuf::from("./generated_audio"),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(600),
            callback_url: DEFAULT_CALLBACK_URL.to_string(),
            style_weight: DEFAULT_WEIGHT,
            weirdness_constraint: DEFAULT_WEIGHT,
            audio_weight: DEFAULT_WEIGHT,
            submit_timeout: Duration::from_secs(30),
        }
    }
}

impl SunoConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                                |
    /// |------------------------------|----------------------------------------|
    /// | `SUNO_API_URL`               | `https://api.sunoapi.org/api/v1`       |
    /// | `SUNO_API_KEY`               | unset                                  |
    /// | `OUTPUT_DIR`                 | `./generated_audio`                    |
    /// | `SUNO_POLL_INTERVAL`         | `5` (seconds)                          |
    /// | `SUNO_MAX_WAIT`              | `600` (seconds)                        |
    /// | `SUNO_CALLBACK_URL`          | `http://localhost:8000/suno-callback`  |
    /// | `SUNO_STYLE_WEIGHT`          | `0.65`                                 |
    /// | `SUNO_WEIRDNESS_CONSTRAINT`  | `0.65`                                 |
    /// | `SUNO_AUDIO_WEIGHT`          | `0.65`                                 |
    /// | `SUNO_SUBMIT_TIMEOUT_SECS`   | `30`                                   |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let api_url = std::env::var("SUNO_API_URL")
            .map(|v| v.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);

        let api_key = std::env::var("SUNO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let output_dir = std::env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);

        let callback_url = std::env::var("SUNO_CALLBACK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or(defaults.callback_url);

        Self {
            api_url,
            api_key,
            output_dir,
            poll_interval: secs_or("SUNO_POLL_INTERVAL", defaults.poll_interval),
            max_wait: secs_or("SUNO_MAX_WAIT", defaults.max_wait),
            callback_url,
            style_weight: f64_or("SUNO_STYLE_WEIGHT", defaults.style_weight),
            weirdness_constraint: f64_or(
                "SUNO_WEIRDNESS_CONSTRAINT",
                defaults.weirdness_constraint,
            ),
            audio_weight: f64_or("SUNO_AUDIO_WEIGHT", defaults.audio_weight),
            submit_timeout: secs_or("SUNO_SUBMIT_TIMEOUT_SECS", defaults.submit_timeout),
        }
    }
}

fn f64_or(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Fractional seconds, as the polling settings accept values like `2.5`.
fn secs_or(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or(default)
}
