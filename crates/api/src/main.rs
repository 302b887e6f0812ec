use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use songbatch_api::config::ServerConfig;
use songbatch_api::router::build_app_router;
use songbatch_api::state::AppState;
use songbatch_pipeline::{
    BatchCoordinator, GenerationService, MemoryTrackStore, PgTrackStore, PipelineConfig,
    TrackStore,
};
use songbatch_suno::{GenerationBackend, StubGenerationService, SunoClient, SunoConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "songbatch_api=debug,songbatch_pipeline=debug,songbatch_suno=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Track store ---
    let store: Arc<dyn TrackStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = songbatch_db::create_pool(&database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            songbatch_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            tracing::info!("Database health check passed");

            songbatch_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgTrackStore::new(pool))
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
            Arc::new(MemoryTrackStore::new())
        }
    };

    // --- Generation service ---
    let suno_config = SunoConfig::from_env();
    std::fs::create_dir_all(&suno_config.output_dir).expect("Failed to create OUTPUT_DIR");

    let service: Arc<dyn GenerationService> = match GenerationBackend::from_env(&suno_config) {
        GenerationBackend::Suno => {
            if suno_config.api_key.is_none() {
                tracing::warn!("SUNO_API_KEY not set, provider requests are unauthenticated");
            }
            tracing::info!(api_url = %suno_config.api_url, "Using Suno generation backend");
            Arc::new(SunoClient::new(suno_config))
        }
        GenerationBackend::Stub => {
            tracing::info!(
                output_dir = %suno_config.output_dir.display(),
                "Using offline stub generation backend"
            );
            Arc::new(StubGenerationService::new(suno_config.output_dir))
        }
    };

    // --- Pipeline ---
    let pipeline_config = PipelineConfig::from_env();
    std::fs::create_dir_all(&pipeline_config.output_dir)
        .expect("Failed to create pipeline output directory");
    let coordinator = BatchCoordinator::new(Arc::clone(&store), service, pipeline_config);

    // --- App state ---
    let state = AppState {
        store,
        coordinator: coordinator.clone(),
        config: Arc::new(config.clone()),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, draining batches");

    let tracker = coordinator.tracker();
    tracker.close();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, tracker.wait()).await.is_err() {
        tracing::warn!(
            in_flight = tracker.len(),
            "Batches still running at shutdown; unfinished tracks restart on the next run"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
