//! Run repository
//!
//! Stores run snapshots. The executor is the single writer; readers always
//! receive clones, never references into the store.

use std::collections::HashMap;

use async_trait::async_trait;
use ferry_core::domain::run::PipelineRun;
use ferry_core::dto::run::Page;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::repository::RepositoryError;

pub const MAX_PAGE_LIMIT: u64 = 100;

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn insert(&self, run: PipelineRun) -> Result<(), RepositoryError>;

    /// Replaces the stored snapshot for the run.
    async fn update(&self, run: &PipelineRun) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineRun>, RepositoryError>;

    /// Lists a user's runs, newest first. `page` starts at 1; `limit` is
    /// clamped to `1..=MAX_PAGE_LIMIT`.
    async fn list_by_user(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Page<PipelineRun>, RepositoryError>;
}

#[derive(Default)]
struct MemoryInner {
    runs: HashMap<Uuid, PipelineRun>,
    order: Vec<Uuid>,
}

/// In-memory run store
#[derive(Default)]
pub struct MemoryRunRepository {
    inner: RwLock<MemoryInner>,
}

impl MemoryRunRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunRepository for MemoryRunRepository {
    async fn insert(&self, run: PipelineRun) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.order.push(run.id);
        inner.runs.insert(run.id, run);
        Ok(())
    }

    async fn update(&self, run: &PipelineRun) -> Result<(), RepositoryError> {
        let mut inner = self.inner.write().await;
        match inner.runs.get_mut(&run.id) {
            Some(stored) => {
                *stored = run.clone();
                Ok(())
            }
            None => Err(RepositoryError(format!("run {} not stored", run.id))),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PipelineRun>, RepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.runs.get(&id).cloned())
    }

    async fn list_by_user(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Page<PipelineRun>, RepositoryError> {
        let page = page.max(1);
        let limit = limit.clamp(1, MAX_PAGE_LIMIT);

        let inner = self.inner.read().await;
        let matching: Vec<&PipelineRun> = inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.runs.get(id))
            .filter(|run| run.user_id == user_id)
            .collect();

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, page, limit))
    }
}
