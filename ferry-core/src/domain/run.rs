//! Pipeline run record and state machine
//!
//! A `PipelineRun` is exclusively owned by the orchestrator for its lifetime;
//! everything else sees cloned snapshots. All mutation goes through the
//! transition methods so step statuses stay monotone and the completion
//! percentage never decreases.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::config::MergeConfiguration;
use crate::domain::step::{StepName, StepRecord, StepStatus};

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    InProgress,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }
}

/// Outcome summary of a successful run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunResults {
    pub files_processed: u64,
    pub directories_copied: u64,
    pub merge_request_id: Option<String>,
    pub merge_request_url: Option<String>,
}

/// Failure detail: which step failed and why
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub step: StepName,
    pub message: String,
}

/// Rejected transition on a run or step
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("run is terminal; no further transitions are accepted")]
    RunTerminal,
    #[error("step {step} is in state {status:?}; transition not allowed")]
    InvalidStepState { step: StepName, status: StepStatus },
}

/// One execution instance of the fixed pipeline for a given configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub user_id: String,
    pub status: RunStatus,
    pub configuration: MergeConfiguration,
    pub steps: Vec<StepRecord>,
    pub results: Option<RunResults>,
    pub error: Option<RunError>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Derived from step statuses; refreshed on every transition.
    pub completion_percentage: u8,
}

impl PipelineRun {
    pub fn new(user_id: impl Into<String>, configuration: MergeConfiguration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            status: RunStatus::Idle,
            configuration,
            steps: StepName::SEQUENCE.iter().copied().map(StepRecord::new).collect(),
            results: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            ended_at: None,
            completion_percentage: 0,
        }
    }

    /// Terminal iff the overall status is terminal or every step has reached
    /// a terminal status. External consumers use exactly this condition for
    /// completion detection.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() || self.steps.iter().all(|s| s.status.is_terminal())
    }

    pub fn step(&self, name: StepName) -> &StepRecord {
        self.steps
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| unreachable!("run always holds the full step sequence"))
    }

    fn step_mut(&mut self, name: StepName) -> &mut StepRecord {
        self.steps
            .iter_mut()
            .find(|s| s.name == name)
            .unwrap_or_else(|| unreachable!("run always holds the full step sequence"))
    }

    /// Marks a step as started.
    pub fn step_started(&mut self, name: StepName) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::RunTerminal);
        }
        let now = chrono::Utc::now();
        let step = self.step_mut(name);
        if step.status != StepStatus::Idle {
            return Err(TransitionError::InvalidStepState {
                step: name,
                status: step.status,
            });
        }
        step.status = StepStatus::InProgress;
        step.started_at = Some(now);
        self.status = RunStatus::InProgress;
        self.started_at.get_or_insert(now);
        self.refresh_percentage();
        Ok(())
    }

    /// Marks a step as succeeded. When every step has succeeded the run
    /// itself becomes `Success`.
    pub fn step_succeeded(
        &mut self,
        name: StepName,
        message: Option<String>,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::RunTerminal);
        }
        let now = chrono::Utc::now();
        let step = self.step_mut(name);
        if step.status != StepStatus::InProgress {
            return Err(TransitionError::InvalidStepState {
                step: name,
                status: step.status,
            });
        }
        step.status = StepStatus::Success;
        step.ended_at = Some(now);
        step.message = message;
        if self.steps.iter().all(|s| s.status == StepStatus::Success) {
            self.status = RunStatus::Success;
            self.ended_at = Some(now);
        }
        self.refresh_percentage();
        Ok(())
    }

    /// Marks a step as failed and the run with it. Steps after the failing
    /// one are short-circuited: they stay `Idle` and never run. An `Idle`
    /// step may fail directly (cancellation before the step starts).
    pub fn step_failed(
        &mut self,
        name: StepName,
        error: impl Into<String>,
    ) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::RunTerminal);
        }
        let now = chrono::Utc::now();
        let step = self.step_mut(name);
        if step.status.is_terminal() {
            return Err(TransitionError::InvalidStepState {
                step: name,
                status: step.status,
            });
        }
        let message = error.into();
        step.status = StepStatus::Failed;
        step.started_at.get_or_insert(now);
        step.ended_at = Some(now);
        step.error = Some(message.clone());
        self.status = RunStatus::Failed;
        self.started_at.get_or_insert(now);
        self.ended_at = Some(now);
        self.error = Some(RunError {
            step: name,
            message,
        });
        self.refresh_percentage();
        Ok(())
    }

    /// `100 × succeeded / steps that will execute`. While no step has failed
    /// every defined step counts; after a failure only the attempted steps
    /// (succeeded + the failing one) count, so the figure reports partial
    /// progress instead of resetting.
    fn refresh_percentage(&mut self) {
        let succeeded = self
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Success)
            .count() as u64;
        let failed = self.steps.iter().any(|s| s.status == StepStatus::Failed);
        let will_execute = if failed {
            self.steps
                .iter()
                .filter(|s| s.status != StepStatus::Idle)
                .count() as u64
        } else {
            self.steps.len() as u64
        };
        if will_execute > 0 {
            self.completion_percentage = (100 * succeeded / will_execute) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::CopyMode;

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
            merge_request_title: "t".to_string(),
            merge_request_description: String::new(),
            commit_message: "m".to_string(),
        }
    }

    fn run() -> PipelineRun {
        PipelineRun::new("user-1", config())
    }

    #[test]
    fn test_new_run_is_idle_with_all_steps() {
        let run = run();
        assert_eq!(run.status, RunStatus::Idle);
        assert_eq!(run.steps.len(), 7);
        assert!(run.steps.iter().all(|s| s.status == StepStatus::Idle));
        assert_eq!(run.completion_percentage, 0);
        assert!(!run.is_terminal());
    }

    #[test]
    fn test_full_success_path() {
        let mut run = run();
        for name in StepName::SEQUENCE {
            run.step_started(name).unwrap();
            run.step_succeeded(name, None).unwrap();
        }
        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.completion_percentage, 100);
        assert!(run.is_terminal());
        assert!(run.ended_at.is_some());
    }

    #[test]
    fn test_percentage_is_monotone_across_success_path() {
        let mut run = run();
        let mut last = 0;
        for name in StepName::SEQUENCE {
            run.step_started(name).unwrap();
            assert!(run.completion_percentage >= last);
            last = run.completion_percentage;
            run.step_succeeded(name, None).unwrap();
            assert!(run.completion_percentage >= last);
            last = run.completion_percentage;
        }
        assert_eq!(last, 100);
    }

    #[test]
    fn test_failure_short_circuits_and_counts_attempted_steps() {
        let mut run = run();
        run.step_started(StepName::ValidateAccess).unwrap();
        run.step_succeeded(StepName::ValidateAccess, None).unwrap();
        run.step_started(StepName::CloneSource).unwrap();
        let before = run.completion_percentage;
        run.step_failed(StepName::CloneSource, "connection reset")
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        let error = run.error.as_ref().unwrap();
        assert_eq!(error.step, StepName::CloneSource);
        assert_eq!(error.message, "connection reset");
        // One success out of the two attempted steps.
        assert_eq!(run.completion_percentage, 50);
        assert!(run.completion_percentage >= before);
        for name in &StepName::SEQUENCE[2..] {
            assert_eq!(run.step(*name).status, StepStatus::Idle);
        }
    }

    #[test]
    fn test_no_transitions_after_terminal() {
        let mut run = run();
        run.step_started(StepName::ValidateAccess).unwrap();
        run.step_failed(StepName::ValidateAccess, "denied").unwrap();

        assert_eq!(
            run.step_started(StepName::CloneSource),
            Err(TransitionError::RunTerminal)
        );
        assert_eq!(
            run.step_failed(StepName::CloneSource, "x"),
            Err(TransitionError::RunTerminal)
        );
        let snapshot = run.clone();
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            serde_json::to_string(&run).unwrap()
        );
    }

    #[test]
    fn test_step_never_regresses() {
        let mut run = run();
        run.step_started(StepName::ValidateAccess).unwrap();
        run.step_succeeded(StepName::ValidateAccess, None).unwrap();
        assert!(matches!(
            run.step_started(StepName::ValidateAccess),
            Err(TransitionError::InvalidStepState { .. })
        ));
    }

    #[test]
    fn test_cancel_before_any_step_fails_first_step_only() {
        let mut run = run();
        run.step_failed(StepName::ValidateAccess, "cancelled").unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.step(StepName::ValidateAccess).status, StepStatus::Failed);
        assert_eq!(
            run.step(StepName::ValidateAccess).error.as_deref(),
            Some("cancelled")
        );
        for name in &StepName::SEQUENCE[1..] {
            assert_eq!(run.step(*name).status, StepStatus::Idle);
        }
        assert_eq!(run.completion_percentage, 0);
    }

    #[test]
    fn test_out_of_order_success_rejected() {
        let mut run = run();
        assert!(matches!(
            run.step_succeeded(StepName::ValidateAccess, None),
            Err(TransitionError::InvalidStepState { .. })
        ));
    }
}
