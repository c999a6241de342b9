//! Run DTOs for the orchestrator API

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::domain::config::MergeConfiguration;

/// Request to start a new pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunRequest {
    pub user_id: String,
    pub configuration: MergeConfiguration,
}

/// Response to a started run; execution continues asynchronously
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: Uuid,
}

/// Response to a cancellation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRunResponse {
    pub accepted: bool,
}

/// Request to preview a copy plan without starting a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewPlanRequest {
    pub source_root: PathBuf,
    pub configuration: MergeConfiguration,
}

/// Pagination parameters for run listings
#[derive(Debug, Clone, Deserialize)]
pub struct RunListQuery {
    pub user_id: String,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

/// One page of a paginated listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        Self {
            items,
            total,
            page,
            limit,
            pages: total.div_ceil(limit.max(1)),
        }
    }
}
