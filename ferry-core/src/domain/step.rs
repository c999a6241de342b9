//! Pipeline step types

use serde::{Deserialize, Serialize};

/// One stage of the fixed pipeline sequence.
///
/// The variant order is the execution order; `StepName` derives `Ord` so the
/// sequence is a total order and illegal step names are unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    ValidateAccess,
    CloneSource,
    SelectFiles,
    CreateBranch,
    CopyFiles,
    SyncTarget,
    CreateMergeRequest,
}

impl StepName {
    /// Execution order of the pipeline, first to last.
    pub const SEQUENCE: [StepName; 7] = [
        StepName::ValidateAccess,
        StepName::CloneSource,
        StepName::SelectFiles,
        StepName::CreateBranch,
        StepName::CopyFiles,
        StepName::SyncTarget,
        StepName::CreateMergeRequest,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepName::ValidateAccess => "validate_access",
            StepName::CloneSource => "clone_source",
            StepName::SelectFiles => "select_files",
            StepName::CreateBranch => "create_branch",
            StepName::CopyFiles => "copy_files",
            StepName::SyncTarget => "sync_target",
            StepName::CreateMergeRequest => "create_merge_request",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution status of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Idle,
    InProgress,
    Success,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Failed)
    }
}

/// Execution record for one step of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: StepName,
    pub status: StepStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl StepRecord {
    pub fn new(name: StepName) -> Self {
        Self {
            name,
            status: StepStatus::Idle,
            started_at: None,
            ended_at: None,
            message: None,
            error: None,
        }
    }

    /// Wall-clock duration of the step, once both timestamps exist.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_ordered() {
        for pair in StepName::SEQUENCE.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_step_name_serializes_snake_case() {
        let json = serde_json::to_string(&StepName::CloneSource).unwrap();
        assert_eq!(json, "\"clone_source\"");
        assert_eq!(StepName::CloneSource.as_str(), "clone_source");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(StepStatus::Success.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(!StepStatus::Idle.is_terminal());
        assert!(!StepStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_duration_requires_both_timestamps() {
        let mut step = StepRecord::new(StepName::ValidateAccess);
        assert!(step.duration().is_none());

        let now = chrono::Utc::now();
        step.started_at = Some(now);
        assert!(step.duration().is_none());

        step.ended_at = Some(now + chrono::Duration::seconds(3));
        assert_eq!(step.duration().unwrap(), chrono::Duration::seconds(3));
    }
}
