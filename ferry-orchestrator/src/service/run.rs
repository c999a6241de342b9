//! Run Service
//!
//! Business logic for pipeline-run lifecycle operations.

use ferry_core::domain::run::PipelineRun;
use ferry_core::dto::run::{
    CancelRunResponse, Page, PreviewPlanRequest, RunListQuery, StartRunRequest, StartRunResponse,
};
use ferry_core::selection::{CopyPlan, compute_copy_plan};
use uuid::Uuid;

use crate::engine::{Engine, EngineError};

/// Service error type
#[derive(Debug)]
pub enum RunError {
    NotFound(Uuid),
    ValidationError(String),
    InternalError(String),
}

impl From<EngineError> for RunError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Configuration(e) => RunError::ValidationError(e.to_string()),
            EngineError::NotFound(id) => RunError::NotFound(id),
            EngineError::Repository(e) => RunError::InternalError(e.to_string()),
        }
    }
}

/// Validate and start a new run; execution continues in the background.
pub async fn start_run(
    engine: &Engine,
    req: StartRunRequest,
) -> Result<StartRunResponse, RunError> {
    let run_id = engine.start_run(req.user_id, req.configuration).await?;
    Ok(StartRunResponse { run_id })
}

/// Get a run snapshot by ID.
pub async fn get_run(engine: &Engine, id: Uuid) -> Result<PipelineRun, RunError> {
    Ok(engine.get_run(id).await?)
}

/// Request cancellation of a run.
pub async fn cancel_run(engine: &Engine, id: Uuid) -> Result<CancelRunResponse, RunError> {
    let accepted = engine.cancel_run(id).await?;
    tracing::info!("run {id} cancellation accepted: {accepted}");
    Ok(CancelRunResponse { accepted })
}

/// List a user's runs, paginated.
pub async fn list_runs(
    engine: &Engine,
    query: RunListQuery,
) -> Result<Page<PipelineRun>, RunError> {
    Ok(engine
        .list_runs(&query.user_id, query.page, query.limit)
        .await?)
}

/// Compute a copy plan without starting a run, for preview/validation.
pub fn preview_plan(req: &PreviewPlanRequest) -> Result<CopyPlan, RunError> {
    req.configuration
        .validate()
        .map_err(|e| RunError::ValidationError(e.to_string()))?;
    compute_copy_plan(&req.source_root, &req.configuration)
        .map_err(|e| RunError::ValidationError(e.to_string()))
}
