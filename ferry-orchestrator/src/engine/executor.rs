//! Step executor
//!
//! Runs the fixed step sequence for one run. Every transition is persisted
//! through the repository so pollers always see a current snapshot. Provider
//! failures become step failures with the provider's message preserved
//! verbatim; nothing is re-thrown past this boundary. Side effects already
//! performed are not rolled back; re-runs are expected to be idempotent.

use std::path::PathBuf;
use std::sync::Arc;

use ferry_core::domain::run::PipelineRun;
use ferry_core::domain::step::StepName;
use ferry_core::selection::{CopyPlan, EntryKind, compute_copy_plan};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::provider::{ProviderError, VcsProvider};
use crate::repository::run::RunRepository;

pub(crate) const CANCELLED_MESSAGE: &str = "cancelled";

pub(crate) struct ExecutorContext {
    pub repository: Arc<dyn RunRepository>,
    pub provider: Arc<dyn VcsProvider>,
    /// Working directory exclusive to this run.
    pub workdir: PathBuf,
    pub cancel: watch::Receiver<bool>,
}

/// Artifacts carried between steps.
struct RunState {
    checkout: PathBuf,
    staging: PathBuf,
    plan: Option<CopyPlan>,
}

pub(crate) async fn execute_run(context: ExecutorContext, mut run: PipelineRun) {
    info!("executing run {}", run.id);

    let mut state = RunState {
        checkout: context.workdir.join("source"),
        staging: context.workdir.join("staging"),
        plan: None,
    };

    for name in StepName::SEQUENCE {
        // Cancellation boundary before every step. A cancelled run fails the
        // upcoming step directly; later steps never run.
        if *context.cancel.borrow() {
            if let Err(e) = run.step_failed(name, CANCELLED_MESSAGE) {
                error!("run {}: rejected cancel transition: {e}", run.id);
            }
            persist(&context, &run).await;
            break;
        }

        if let Err(e) = run.step_started(name) {
            error!("run {}: rejected start of {name}: {e}", run.id);
            break;
        }
        persist(&context, &run).await;
        debug!("run {}: step {name} started", run.id);

        match run_step(&context, &mut run, name, &mut state).await {
            Ok(message) => {
                if let Err(e) = run.step_succeeded(name, message) {
                    error!("run {}: rejected success of {name}: {e}", run.id);
                    break;
                }
                persist(&context, &run).await;
            }
            Err(message) => {
                warn!("run {}: step {name} failed: {message}", run.id);
                if let Err(e) = run.step_failed(name, message) {
                    error!("run {}: rejected failure of {name}: {e}", run.id);
                }
                persist(&context, &run).await;
                break;
            }
        }
    }

    if let Err(e) = tokio::fs::remove_dir_all(&context.workdir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("run {}: failed to clean working directory: {e}", run.id);
        }
    }

    info!("run {} finished with status {:?}", run.id, run.status);
}

async fn persist(context: &ExecutorContext, run: &PipelineRun) {
    if let Err(e) = context.repository.update(run).await {
        error!("run {}: failed to persist snapshot: {e}", run.id);
    }
}

/// Runs the provider call for one step, racing it against cancellation where
/// the operation is long-running.
async fn with_cancel<T>(
    cancel: &watch::Receiver<bool>,
    operation: impl Future<Output = Result<T, ProviderError>>,
) -> Result<T, String> {
    let mut cancel = cancel.clone();
    tokio::select! {
        result = operation => result.map_err(|e| e.to_string()),
        _ = async {
            if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
                std::future::pending::<()>().await;
            }
        } => Err(CANCELLED_MESSAGE.to_string()),
    }
}

async fn run_step(
    context: &ExecutorContext,
    run: &mut PipelineRun,
    name: StepName,
    state: &mut RunState,
) -> Result<Option<String>, String> {
    let config = run.configuration.clone();
    match name {
        StepName::ValidateAccess => {
            with_cancel(
                &context.cancel,
                context
                    .provider
                    .validate_access(&config.source_repo, &config.source_credential),
            )
            .await?;
            with_cancel(
                &context.cancel,
                context
                    .provider
                    .validate_access(&config.target_repo, &config.target_credential),
            )
            .await?;
            Ok(Some("source and target access verified".to_string()))
        }
        StepName::CloneSource => {
            // Last write wins: an existing destination is deleted, never
            // merged into.
            if state.checkout.exists() {
                tokio::fs::remove_dir_all(&state.checkout)
                    .await
                    .map_err(|e| format!("failed to clear clone destination: {e}"))?;
            }
            with_cancel(
                &context.cancel,
                context.provider.clone_repository(
                    &config.source_repo,
                    &config.source_credential,
                    &state.checkout,
                ),
            )
            .await?;
            Ok(None)
        }
        StepName::SelectFiles => {
            let plan =
                compute_copy_plan(&state.checkout, &config).map_err(|e| e.to_string())?;
            for warning in &plan.warnings {
                warn!(
                    "run {}: skipped unreadable path {}: {}",
                    run.id,
                    warning.path.display(),
                    warning.message
                );
            }
            // A partial plan proceeds; an empty one has nothing to merge.
            if plan.is_empty() {
                return Err("copy plan is empty".to_string());
            }
            let message = format!(
                "{} files, {} directories selected",
                plan.file_count(),
                plan.directory_count()
            );
            state.plan = Some(plan);
            Ok(Some(message))
        }
        StepName::CreateBranch => {
            with_cancel(
                &context.cancel,
                context.provider.create_branch(
                    &config.target_repo,
                    &config.target_credential,
                    &config.target_branch,
                    &config.base_branch,
                ),
            )
            .await?;
            Ok(None)
        }
        StepName::CopyFiles => {
            let plan = state.plan.as_ref().ok_or("no copy plan computed")?;
            let mut files = 0u64;
            for entry in &plan.entries {
                let destination = state.staging.join(&entry.destination);
                match entry.kind {
                    EntryKind::Directory => {
                        tokio::fs::create_dir_all(&destination)
                            .await
                            .map_err(|e| format!("failed to create {}: {e}", destination.display()))?;
                    }
                    EntryKind::File => {
                        if let Some(parent) = destination.parent() {
                            tokio::fs::create_dir_all(parent)
                                .await
                                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
                        }
                        let source = state.checkout.join(&entry.source);
                        tokio::fs::copy(&source, &destination)
                            .await
                            .map_err(|e| format!("failed to copy {}: {e}", source.display()))?;
                        files += 1;
                    }
                }
            }
            Ok(Some(format!("{files} files staged")))
        }
        StepName::SyncTarget => {
            let plan = state.plan.as_ref().ok_or("no copy plan computed")?;
            let outcome = with_cancel(
                &context.cancel,
                context.provider.sync_content(
                    plan,
                    &state.staging,
                    &config.target_repo,
                    &config.target_credential,
                    &config.target_branch,
                    &config.commit_message,
                ),
            )
            .await?;
            let results = run.results.get_or_insert_default();
            results.files_processed = outcome.files_processed;
            results.directories_copied = outcome.directories_copied;
            Ok(Some(format!(
                "{} files, {} directories synced",
                outcome.files_processed, outcome.directories_copied
            )))
        }
        StepName::CreateMergeRequest => {
            let info = with_cancel(
                &context.cancel,
                context.provider.create_merge_request(
                    &config.target_repo,
                    &config.target_credential,
                    &config.target_branch,
                    &config.base_branch,
                    &config.merge_request_title,
                    &config.merge_request_description,
                ),
            )
            .await?;
            let results = run.results.get_or_insert_default();
            results.merge_request_id = Some(info.id);
            results.merge_request_url = Some(info.url.clone());
            Ok(Some(info.url))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests_support {
    use std::path::Path;
    use std::time::Duration;

    use async_trait::async_trait;
    use ferry_core::selection::CopyPlan;

    use crate::provider::{MergeRequestInfo, ProviderError, SyncOutcome, VcsProvider};

    /// Provider stub: "clones" a small fixture tree and answers every other
    /// capability locally. Individual steps can be failed or delayed.
    #[derive(Default)]
    pub(crate) struct StubProvider {
        pub clone_files: Vec<(&'static str, &'static str)>,
        pub validate_delay: Option<Duration>,
        pub fail_validate: Option<String>,
        pub fail_clone: Option<String>,
        pub fail_branch: Option<String>,
        pub fail_sync: Option<String>,
        pub fail_merge_request: Option<String>,
    }

    impl StubProvider {
        pub(crate) fn succeeding() -> Self {
            Self {
                clone_files: vec![
                    ("README.md", "readme"),
                    ("src/index.ts", "ts"),
                    ("docs/guide.md", "guide"),
                ],
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl VcsProvider for StubProvider {
        async fn validate_access(
            &self,
            _repo: &str,
            _credential: &str,
        ) -> Result<(), ProviderError> {
            if let Some(delay) = self.validate_delay {
                tokio::time::sleep(delay).await;
            }
            match &self.fail_validate {
                Some(message) => Err(ProviderError::new(message)),
                None => Ok(()),
            }
        }

        async fn clone_repository(
            &self,
            _repo: &str,
            _credential: &str,
            destination: &Path,
        ) -> Result<(), ProviderError> {
            if let Some(message) = &self.fail_clone {
                return Err(ProviderError::new(message));
            }
            for (path, content) in &self.clone_files {
                let file = destination.join(path);
                if let Some(parent) = file.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| ProviderError::new(e.to_string()))?;
                }
                tokio::fs::write(&file, content)
                    .await
                    .map_err(|e| ProviderError::new(e.to_string()))?;
            }
            Ok(())
        }

        async fn create_branch(
            &self,
            _repo: &str,
            _credential: &str,
            _branch: &str,
            _base: &str,
        ) -> Result<(), ProviderError> {
            match &self.fail_branch {
                Some(message) => Err(ProviderError::new(message)),
                None => Ok(()),
            }
        }

        async fn sync_content(
            &self,
            plan: &CopyPlan,
            _staging: &Path,
            _repo: &str,
            _credential: &str,
            _branch: &str,
            _commit_message: &str,
        ) -> Result<SyncOutcome, ProviderError> {
            match &self.fail_sync {
                Some(message) => Err(ProviderError::new(message)),
                None => Ok(SyncOutcome {
                    files_processed: plan.file_count() as u64,
                    directories_copied: plan.directory_count() as u64,
                }),
            }
        }

        async fn create_merge_request(
            &self,
            repo: &str,
            _credential: &str,
            source_branch: &str,
            target_branch: &str,
            _title: &str,
            _description: &str,
        ) -> Result<MergeRequestInfo, ProviderError> {
            match &self.fail_merge_request {
                Some(message) => Err(ProviderError::new(message)),
                None => Ok(MergeRequestInfo {
                    id: "1".to_string(),
                    url: format!("{repo}/merge_requests/{target_branch}...{source_branch}"),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::tests_support::StubProvider;
    use super::*;
    use crate::repository::run::{MemoryRunRepository, RunRepository};
    use ferry_core::domain::config::{CopyMode, MergeConfiguration};
    use ferry_core::domain::run::RunStatus;
    use ferry_core::domain::step::{StepName, StepStatus};

    fn config() -> MergeConfiguration {
        MergeConfiguration {
            source_repo: "https://example.com/src.git".to_string(),
            source_credential: String::new(),
            target_repo: "https://example.com/dst.git".to_string(),
            target_credential: String::new(),
            target_branch: "merge/docs".to_string(),
            base_branch: "main".to_string(),
            copy_mode: CopyMode::Files,
            file_patterns: vec!["*.md".to_string()],
            folder_paths: vec![],
            exclude_patterns: vec![],
            preserve_structure: true,
            merge_request_title: "Merge docs".to_string(),
            merge_request_description: String::new(),
            commit_message: "Import docs".to_string(),
        }
    }

    async fn run_to_completion(
        provider: StubProvider,
        configuration: MergeConfiguration,
        cancelled: bool,
    ) -> PipelineRun {
        let repository = Arc::new(MemoryRunRepository::new());
        let workdir = tempfile::tempdir().unwrap();
        let run = PipelineRun::new("user-1", configuration);
        let run_id = run.id;
        repository.insert(run.clone()).await.unwrap();

        let (cancel_tx, cancel_rx) = watch::channel(cancelled);
        let context = ExecutorContext {
            repository: Arc::clone(&repository) as Arc<dyn RunRepository>,
            provider: Arc::new(provider),
            workdir: workdir.path().join(run_id.to_string()),
            cancel: cancel_rx,
        };
        execute_run(context, run).await;
        drop(cancel_tx);

        repository.find_by_id(run_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_all_steps_succeed_in_order() {
        let run = run_to_completion(StubProvider::succeeding(), config(), false).await;

        assert_eq!(run.status, RunStatus::Success);
        for name in StepName::SEQUENCE {
            let step = run.step(name);
            assert_eq!(step.status, StepStatus::Success, "step {name}");
            assert!(step.duration().is_some());
        }
        let results = run.results.as_ref().unwrap();
        assert_eq!(results.files_processed, 2);
        assert_eq!(results.directories_copied, 0);
        assert!(results.merge_request_id.is_some());
    }

    #[tokio::test]
    async fn test_cancel_before_any_step() {
        let run = run_to_completion(StubProvider::succeeding(), config(), true).await;

        assert_eq!(run.status, RunStatus::Failed);
        let first = run.step(StepName::ValidateAccess);
        assert_eq!(first.status, StepStatus::Failed);
        assert_eq!(first.error.as_deref(), Some(CANCELLED_MESSAGE));
        for name in &StepName::SEQUENCE[1..] {
            assert_eq!(run.step(*name).status, StepStatus::Idle);
        }
    }

    #[tokio::test]
    async fn test_empty_plan_fails_select_step() {
        let mut provider = StubProvider::succeeding();
        provider.clone_files = vec![("src/index.ts", "ts")];
        let run = run_to_completion(provider, config(), false).await;

        assert_eq!(run.status, RunStatus::Failed);
        let error = run.error.as_ref().unwrap();
        assert_eq!(error.step, StepName::SelectFiles);
        assert_eq!(error.message, "copy plan is empty");
        assert_eq!(run.step(StepName::CreateBranch).status, StepStatus::Idle);
    }

    #[tokio::test]
    async fn test_provider_message_preserved_verbatim() {
        let mut provider = StubProvider::succeeding();
        provider.fail_sync = Some("push rejected: protected branch".to_string());
        let run = run_to_completion(provider, config(), false).await;

        assert_eq!(run.status, RunStatus::Failed);
        let error = run.error.as_ref().unwrap();
        assert_eq!(error.step, StepName::SyncTarget);
        assert_eq!(error.message, "push rejected: protected branch");
        assert_eq!(
            run.step(StepName::SyncTarget).error.as_deref(),
            Some("push rejected: protected branch")
        );
    }

    #[tokio::test]
    async fn test_access_failure_fails_first_step() {
        let mut provider = StubProvider::succeeding();
        provider.fail_validate = Some("401 unauthorized".to_string());
        let run = run_to_completion(provider, config(), false).await;

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_ref().unwrap().step, StepName::ValidateAccess);
        assert_eq!(run.completion_percentage, 0);
    }

    #[tokio::test]
    async fn test_folders_mode_counts_directories() {
        let mut configuration = config();
        configuration.copy_mode = CopyMode::Folders;
        configuration.file_patterns.clear();
        configuration.folder_paths = vec!["docs".to_string()];

        let run = run_to_completion(StubProvider::succeeding(), configuration, false).await;

        assert_eq!(run.status, RunStatus::Success);
        let results = run.results.as_ref().unwrap();
        assert_eq!(results.files_processed, 1);
        assert_eq!(results.directories_copied, 1);
    }
}
