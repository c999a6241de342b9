//! Pipeline engine
//!
//! Owns the run registry and drives one executor task per run. Runs execute
//! strictly sequentially inside their task; distinct runs are independent and
//! each gets a disjoint working directory derived from its identity.

pub mod executor;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ferry_core::domain::config::{ConfigurationError, MergeConfiguration};
use ferry_core::domain::run::PipelineRun;
use ferry_core::dto::run::Page;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tracing::{info, warn};
use uuid::Uuid;

use crate::provider::VcsProvider;
use crate::repository::RepositoryError;
use crate::repository::run::RunRepository;
use crate::repository::settings::{SettingsStore, UserSettings};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("run {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct Engine {
    repository: Arc<dyn RunRepository>,
    settings: Arc<dyn SettingsStore>,
    provider: Arc<dyn VcsProvider>,
    workdir: PathBuf,
    /// Cancellation senders for live runs; a run accepts at most one
    /// outstanding cancellation request.
    cancellations: Arc<Mutex<HashMap<Uuid, watch::Sender<bool>>>>,
}

impl Engine {
    pub fn new(
        repository: Arc<dyn RunRepository>,
        settings: Arc<dyn SettingsStore>,
        provider: Arc<dyn VcsProvider>,
        workdir: PathBuf,
    ) -> Self {
        Self {
            repository,
            settings,
            provider,
            workdir,
            cancellations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Validates the configuration, creates the run, and begins asynchronous
    /// execution. Returns as soon as the run is registered. An existing clone
    /// destination under the run's working directory is overwritten, not
    /// merged.
    pub async fn start_run(
        &self,
        user_id: impl Into<String>,
        configuration: MergeConfiguration,
    ) -> Result<Uuid, EngineError> {
        configuration.validate()?;
        let user_id = user_id.into();

        let run = PipelineRun::new(user_id.clone(), configuration.clone());
        let run_id = run.id;
        self.repository.insert(run.clone()).await?;

        if let Err(e) = self
            .settings
            .save(
                &user_id,
                UserSettings {
                    last_configuration: Some(configuration),
                },
            )
            .await
        {
            warn!("failed to record settings for {user_id}: {e}");
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        self.cancellations.lock().await.insert(run_id, cancel_tx);

        let context = executor::ExecutorContext {
            repository: Arc::clone(&self.repository),
            provider: Arc::clone(&self.provider),
            workdir: self.workdir.join(run_id.to_string()),
            cancel: cancel_rx,
        };
        let cancellations = Arc::clone(&self.cancellations);
        tokio::spawn(async move {
            executor::execute_run(context, run).await;
            cancellations.lock().await.remove(&run_id);
        });

        info!("run {run_id} started for user {user_id}");
        Ok(run_id)
    }

    /// Idempotent snapshot read.
    pub async fn get_run(&self, run_id: Uuid) -> Result<PipelineRun, EngineError> {
        self.repository
            .find_by_id(run_id)
            .await?
            .ok_or(EngineError::NotFound(run_id))
    }

    /// Requests cancellation. Advisory: takes effect at the next checked
    /// boundary. Returns whether the request was accepted; a terminal run or
    /// a repeated request is refused.
    pub async fn cancel_run(&self, run_id: Uuid) -> Result<bool, EngineError> {
        let run = self.get_run(run_id).await?;
        if run.is_terminal() {
            return Ok(false);
        }

        let cancellations = self.cancellations.lock().await;
        match cancellations.get(&run_id) {
            Some(sender) => {
                if *sender.borrow() {
                    return Ok(false);
                }
                let accepted = sender.send(true).is_ok();
                if accepted {
                    info!("run {run_id} cancellation requested");
                }
                Ok(accepted)
            }
            // Executor already finished and deregistered.
            None => Ok(false),
        }
    }

    pub async fn list_runs(
        &self,
        user_id: &str,
        page: u64,
        limit: u64,
    ) -> Result<Page<PipelineRun>, EngineError> {
        Ok(self.repository.list_by_user(user_id, page, limit).await?)
    }
}
