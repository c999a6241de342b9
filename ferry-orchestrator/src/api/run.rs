//! Run API Handlers
//!
//! HTTP endpoints for the pipeline-run lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use ferry_core::domain::run::PipelineRun;
use ferry_core::dto::run::{
    CancelRunResponse, Page, PreviewPlanRequest, RunListQuery, StartRunRequest, StartRunResponse,
};
use ferry_core::selection::CopyPlan;
use uuid::Uuid;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

/// POST /api/runs
/// Validate the configuration and start a run. Returns immediately; the
/// pipeline executes in the background.
pub async fn start_run(
    State(state): State<AppState>,
    Json(req): Json<StartRunRequest>,
) -> ApiResult<(StatusCode, Json<StartRunResponse>)> {
    tracing::info!("Starting run for user: {}", req.user_id);

    let response = run_service::start_run(&state.engine, req).await?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/runs/{id}
/// Get a run snapshot by ID
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineRun>> {
    tracing::debug!("Getting run: {}", id);

    let run = run_service::get_run(&state.engine, id).await?;
    Ok(Json(run))
}

/// POST /api/runs/{id}/cancel
/// Request cancellation of a run
pub async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelRunResponse>> {
    tracing::info!("Cancelling run: {}", id);

    let response = run_service::cancel_run(&state.engine, id).await?;
    Ok(Json(response))
}

/// GET /api/runs?user_id=&page=&limit=
/// List a user's runs, newest first
pub async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<RunListQuery>,
) -> ApiResult<Json<Page<PipelineRun>>> {
    tracing::debug!("Listing runs for user: {}", query.user_id);

    let page = run_service::list_runs(&state.engine, query).await?;
    Ok(Json(page))
}

/// POST /api/plan/preview
/// Compute a copy plan for a local source tree without starting a run
pub async fn preview_plan(
    State(_state): State<AppState>,
    Json(req): Json<PreviewPlanRequest>,
) -> ApiResult<Json<CopyPlan>> {
    tracing::debug!("Previewing plan for {}", req.source_root.display());

    let plan = run_service::preview_plan(&req)?;
    Ok(Json(plan))
}
