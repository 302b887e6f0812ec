#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use songbatch_api::config::ServerConfig;
use songbatch_api::router::build_app_router;
use songbatch_api::state::AppState;
use songbatch_core::duration::{DurationEstimator, PcmFormat};
use songbatch_pipeline::{BatchCoordinator, MemoryTrackStore, PipelineConfig};
use songbatch_suno::StubGenerationService;
use tempfile::TempDir;
use tower::ServiceExt;

/// Sample rate of the stub's WAV output; small to keep artifacts tiny.
pub const STUB_SAMPLE_RATE: u32 = 100;

pub const BOUNDARY: &str = "songbatch-test-boundary";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        frontend_dir: PathBuf::from("./does-not-exist"),
        max_upload_bytes: 1024 * 1024,
        shutdown_timeout_secs: 5,
    }
}

/// A router over the in-memory store and the zero-latency stub service.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryTrackStore>,
    pub coordinator: BatchCoordinator,
    pub dir: TempDir,
}

impl TestApp {
    /// Wait until every scheduled batch finished.
    pub async fn drain(&self) {
        let tracker = self.coordinator.tracker();
        tracker.close();
        tokio::time::timeout(Duration::from_secs(30), tracker.wait())
            .await
            .expect("batches did not finish");
    }
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the router construction in `main.rs` with the in-memory store
/// and the stub generation backend writing into a temporary directory.
pub fn build_test_app() -> TestApp {
    build_test_app_with(test_config())
}

pub fn build_test_app_with(config: ServerConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryTrackStore::new());
    let service = Arc::new(
        StubGenerationService::new(dir.path())
            .with_sample_rate(STUB_SAMPLE_RATE)
            .with_delay(Duration::ZERO..Duration::ZERO),
    );
    let pipeline_config = PipelineConfig {
        retry_delay: Duration::ZERO,
        stitch_extensions: true,
        estimator: DurationEstimator {
            pcm: PcmFormat {
                sample_rate: STUB_SAMPLE_RATE,
                bytes_per_sample: 2,
                channels: 1,
            },
            ..DurationEstimator::default()
        },
        output_dir: dir.path().to_path_buf(),
    };
    let coordinator = BatchCoordinator::new(store.clone(), service, pipeline_config);

    let state = AppState {
        store: store.clone(),
        coordinator: coordinator.clone(),
        config: Arc::new(config.clone()),
    };

    TestApp {
        router: build_app_router(state, &config),
        store,
        coordinator,
        dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &TestApp, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &TestApp, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

/// One multipart part: `(field name, optional filename, content)`.
pub type Part<'a> = (&'a str, Option<&'a str>, &'a str);

pub fn multipart_body(parts: &[Part<'_>]) -> String {
    let mut body = String::new();
    for (name, filename, content) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(filename) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/json\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

pub async fn post_multipart(app: &TestApp, uri: &str, parts: &[Part<'_>]) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap();
    app.router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
