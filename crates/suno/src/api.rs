//! REST API client for the Suno HTTP endpoints.
//!
//! Wraps generation and extension submission, task status lookup, and
//! artifact download using [`reqwest`].

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::config::SunoConfig;
use crate::messages;

/// HTTP client for one Suno API deployment.
pub struct SunoApi {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    submit_timeout: Duration,
    download_timeout: Duration,
}

/// Errors from the Suno REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum SunoApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Suno returned a non-2xx status code.
    #[error("Suno API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response that does not have the expected shape.
    #[error("Unexpected Suno API response: {0}")]
    Protocol(String),

    /// The task finished unsuccessfully.
    #[error("Suno API reported failure: {status} - {message}")]
    TaskFailed { status: String, message: String },

    /// The task did not finish within the polling budget.
    #[error("Timed out after {}s waiting for task {task_id}", .waited.as_secs_f64())]
    Timeout { task_id: String, waited: Duration },

    /// Writing the downloaded artifact failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Body of `POST /generate`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateBody<'a> {
    pub prompt: &'a str,
    pub custom_mode: bool,
    pub style: &'a str,
    pub title: &'a str,
    pub instrumental: bool,
    /// Suno model name, see [`crate::models::map_model`].
    pub model: String,
    pub negative_tags: &'a str,
    pub style_weight: f64,
    pub weirdness_constraint: f64,
    pub audio_weight: f64,
    pub call_back_url: &'a str,
}

/// Body of `POST /generate/extend`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendBody<'a> {
    pub audio_id: &'a str,
    /// Reuse the original generation's parameters.
    pub default_param_flag: bool,
    pub prompt: &'a str,
    pub model: String,
    /// Second at which the extension starts; the clip end when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_back_url: Option<&'a str>,
}

impl SunoApi {
    /// Create a new API client from configuration.
    pub fn new(config: &SunoConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &SunoConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            submit_timeout: config.submit_timeout,
            download_timeout: config.max_wait,
        }
    }

    /// Submit a generation. Sends `POST /generate` and returns the task id.
    pub async fn submit_generate(&self, body: &GenerateBody<'_>) -> Result<String, SunoApiError> {
        let request = self
            .client
            .post(format!("{}/generate", self.api_url))
            .timeout(self.submit_timeout)
            .json(body);
        let response = self.authorized(request).send().await?;
        let value: Value = Self::parse_response(response).await?;
        messages::parse_task_id(&value)
    }

    /// Submit an extension. Sends `POST /generate/extend` and returns the
    /// task id.
    pub async fn submit_extend(&self, body: &ExtendBody<'_>) -> Result<String, SunoApiError> {
        let request = self
            .client
            .post(format!("{}/generate/extend", self.api_url))
            .timeout(self.submit_timeout)
            .json(body);
        let response = self.authorized(request).send().await?;
        let value: Value = Self::parse_response(response).await?;
        messages::parse_task_id(&value)
    }

    /// Fetch the raw status document of a task via
    /// `GET /generate/record-info?taskId=...`.
    pub async fn record_info(&self, task_id: &str) -> Result<Value, SunoApiError> {
        let request = self
            .client
            .get(format!("{}/generate/record-info", self.api_url))
            .timeout(self.submit_timeout)
            .query(&[("taskId", task_id)]);
        let response = self.authorized(request).send().await?;
        Self::parse_response(response).await
    }

    /// Stream `url` into `path`, returning the number of bytes written.
    ///
    /// The body is written to a sibling `.part` file and renamed into place
    /// once complete.
    pub async fn download(&self, url: &str, path: &Path) -> Result<u64, SunoApiError> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await?;
        let mut response = Self::ensure_success(response).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut partial_name = path.as_os_str().to_owned();
        partial_name.push(".part");
        let partial = Path::new(&partial_name);

        let mut file = tokio::fs::File::create(partial).await?;
        let mut written = 0u64;
        let result: Result<(), SunoApiError> = async {
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            Ok(())
        }
        .await;
        drop(file);

        match result {
            Ok(()) => {
                tokio::fs::rename(partial, path).await?;
                tracing::info!(path = %path.display(), bytes = written, "Downloaded audio");
                Ok(written)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(partial).await;
                Err(e)
            }
        }
    }

    // ---- private helpers ----

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`SunoApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SunoApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SunoApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Check the status code and deserialize the JSON body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SunoApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}
