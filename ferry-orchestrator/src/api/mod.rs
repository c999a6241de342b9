//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::engine::Engine;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// Create the main API router with all endpoints
pub fn create_router(engine: Arc<Engine>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run endpoints
        .route("/api/runs", post(run::start_run))
        .route("/api/runs", get(run::list_runs))
        .route("/api/runs/{id}", get(run::get_run))
        .route("/api/runs/{id}/cancel", post(run::cancel_run))
        // Plan preview
        .route("/api/plan/preview", post(run::preview_plan))
        // Add state and middleware
        .with_state(AppState { engine })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
