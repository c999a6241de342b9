//! File-selection engine
//!
//! `matcher` evaluates include/exclude rules against relative paths (pure,
//! no I/O); `planner` walks a source tree and produces a concrete copy plan.

pub mod matcher;
pub mod planner;

pub use matcher::{Decision, RuleSet};
pub use planner::{CopyPlan, CopyPlanEntry, EntryKind, PlanWarning, compute_copy_plan};

use thiserror::Error;

/// Errors from the selection engine
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("source root does not exist: {0}")]
    MissingRoot(std::path::PathBuf),
}
