//! Run-related API endpoints

use crate::FerryClient;
use crate::error::Result;
use ferry_core::domain::run::PipelineRun;
use ferry_core::dto::run::{
    CancelRunResponse, Page, PreviewPlanRequest, StartRunRequest, StartRunResponse,
};
use ferry_core::selection::CopyPlan;
use uuid::Uuid;

impl FerryClient {
    /// Start a new pipeline run
    ///
    /// The orchestrator validates the configuration synchronously and
    /// executes the pipeline in the background.
    pub async fn start_run(&self, req: StartRunRequest) -> Result<StartRunResponse> {
        let url = format!("{}/api/runs", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Get a run snapshot by ID
    ///
    /// Idempotent: a terminal run returns the identical snapshot on every
    /// call.
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun> {
        let url = format!("{}/api/runs/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Request cancellation of a run
    ///
    /// Advisory: the pipeline stops at its next cancellation boundary.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<CancelRunResponse> {
        let url = format!("{}/api/runs/{}/cancel", self.base_url, run_id);
        let response = self.client.post(&url).send().await?;

        self.handle_response(response).await
    }

    /// List a user's runs, newest first
    pub async fn list_runs(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Page<PipelineRun>> {
        let url = format!("{}/api/runs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("user_id", user_id)])
            .query(&[("page", page), ("limit", limit)])
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Preview the copy plan for a configuration without starting a run
    pub async fn preview_plan(&self, req: PreviewPlanRequest) -> Result<CopyPlan> {
        let url = format!("{}/api/plan/preview", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
