use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod engine;
pub mod provider;
pub mod repository;
pub mod service;

use engine::Engine;
use provider::git::GitCliProvider;
use repository::run::MemoryRunRepository;
use repository::settings::MemorySettingsStore;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ferry_orchestrator=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Ferry Orchestrator...");

    // Working directory for run checkouts; each run gets its own subtree.
    let workdir = std::env::var("FERRY_WORKDIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("ferry"));

    tokio::fs::create_dir_all(&workdir)
        .await
        .expect("Failed to create working directory");

    tracing::info!("Working directory: {}", workdir.display());

    let engine = Arc::new(Engine::new(
        Arc::new(MemoryRunRepository::new()),
        Arc::new(MemorySettingsStore::new()),
        Arc::new(GitCliProvider::new(workdir.join("git"))),
        workdir.join("runs"),
    ));

    // Build router with all API endpoints
    let app = api::create_router(engine);

    // Get bind address
    let addr = std::env::var("FERRY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
