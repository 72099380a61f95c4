//! stemforge-ae - Audio Engineering Service
//!
//! Accepts mixed audio tracks and runs them through a staged pipeline:
//! stem separation, refinement into sub-stems, MIDI transcription,
//! composite note synthesis, advisory review, and project export.
//! Clients poll job status over HTTP until a terminal state.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stemforge_ae::config::{Args, ServiceConfig};
use stemforge_ae::engines::EngineSet;
use stemforge_ae::manager::JobManager;
use stemforge_ae::pipeline::PipelineOrchestrator;
use stemforge_ae::storage::JobStorage;
use stemforge_ae::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing; RUST_LOG overrides the default info level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting stemforge-ae (Audio Engineering) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = ServiceConfig::resolve(&args)?;
    info!("Jobs root: {}", config.jobs_root.display());
    info!("Worker slots: {}", config.worker_slots);

    std::fs::create_dir_all(&config.jobs_root)?;
    let storage = Arc::new(JobStorage::new(&config.jobs_root));

    let engines = EngineSet::production(&config);
    let orchestrator = Arc::new(PipelineOrchestrator::with_default_stages(
        storage.clone(),
        &engines,
    ));
    let manager = Arc::new(JobManager::new(
        storage,
        orchestrator,
        config.worker_slots,
        config.accepted_models.clone(),
        config.default_model.clone(),
    ));

    // Jobs left non-terminal by a previous process are failed, never resumed
    let recovered = manager.recover_orphans()?;
    if recovered > 0 {
        warn!(recovered, "Failed orphaned jobs from a previous run");
    }

    let state = AppState::new(manager);
    let app = stemforge_ae::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
