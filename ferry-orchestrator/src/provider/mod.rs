//! Version-control provider capabilities
//!
//! The pipeline consumes the hosting providers through this trait; network
//! details live in the adapters. Adapter failures carry the provider's own
//! wording, which the executor preserves verbatim on the failing step.

pub mod git;

use std::path::Path;

use async_trait::async_trait;
use ferry_core::selection::CopyPlan;
use thiserror::Error;

/// Failure reported by a provider adapter
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of pushing a copy plan's content to the target
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub files_processed: u64,
    pub directories_copied: u64,
}

/// An opened merge request
#[derive(Debug, Clone)]
pub struct MergeRequestInfo {
    pub id: String,
    pub url: String,
}

/// Abstract capability interface over the two version-control providers.
///
/// Adapters decide their own timeout policy; the orchestrator applies none.
#[async_trait]
pub trait VcsProvider: Send + Sync {
    /// Checks that the credential can reach the repository.
    async fn validate_access(&self, repo: &str, credential: &str) -> Result<(), ProviderError>;

    /// Clones the repository into `destination`, overwriting an existing
    /// directory (last write wins).
    async fn clone_repository(
        &self,
        repo: &str,
        credential: &str,
        destination: &Path,
    ) -> Result<(), ProviderError>;

    /// Creates `branch` on the target repository from `base`.
    async fn create_branch(
        &self,
        repo: &str,
        credential: &str,
        branch: &str,
        base: &str,
    ) -> Result<(), ProviderError>;

    /// Commits the staged copy-plan content to `branch` and pushes it.
    async fn sync_content(
        &self,
        plan: &CopyPlan,
        staging: &Path,
        repo: &str,
        credential: &str,
        branch: &str,
        commit_message: &str,
    ) -> Result<SyncOutcome, ProviderError>;

    /// Opens a merge request from `source_branch` into `target_branch`.
    async fn create_merge_request(
        &self,
        repo: &str,
        credential: &str,
        source_branch: &str,
        target_branch: &str,
        title: &str,
        description: &str,
    ) -> Result<MergeRequestInfo, ProviderError>;
}
