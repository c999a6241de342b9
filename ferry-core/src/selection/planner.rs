//! File selector
//!
//! Walks a source tree once (depth-first, directories before their contents)
//! and applies the pattern matcher to produce a concrete copy plan. An
//! unreadable path becomes a per-entry warning, not an aborted computation;
//! callers decide whether a partial plan is fatal.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::domain::config::MergeConfiguration;
use crate::selection::matcher::{Decision, RuleSet, normalize};
use crate::selection::SelectionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// One source → destination pair of the copy plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyPlanEntry {
    /// Path relative to the source root.
    pub source: PathBuf,
    /// Path relative to the copy destination.
    pub destination: PathBuf,
    pub kind: EntryKind,
    /// The pattern or folder rule that selected this entry.
    pub selected_by: String,
}

/// A path the selector could not read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanWarning {
    pub path: PathBuf,
    pub message: String,
}

/// Concrete list of copy operations for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopyPlan {
    pub entries: Vec<CopyPlanEntry>,
    pub warnings: Vec<PlanWarning>,
}

impl CopyPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count()
    }

    pub fn directory_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::Directory)
            .count()
    }
}

/// Computes the copy plan for a source tree under the given configuration.
///
/// Mode dispatch per entry: `files` matches files against patterns and only
/// traverses directories; `folders` selects a directory wholesale on the
/// first matching folder rule, after which descendants inherit the selection
/// instead of being re-matched; `mixed` unions both with first-selection-wins
/// de-duplication by destination. Exclude patterns reject a path everywhere,
/// wholesale-selected subtrees included.
pub fn compute_copy_plan(
    source_root: &Path,
    config: &MergeConfiguration,
) -> Result<CopyPlan, SelectionError> {
    let rules = RuleSet::new(config)?;
    if !source_root.is_dir() {
        return Err(SelectionError::MissingRoot(source_root.to_path_buf()));
    }

    let mut plan = CopyPlan::default();
    let mut destinations: HashSet<PathBuf> = HashSet::new();
    let mut flat_names = FlatNames::default();
    // Wholesale-selected folders: (relative prefix, rule, destination root).
    let mut selected_folders: Vec<(String, String, PathBuf)> = Vec::new();

    let walker = WalkDir::new(source_root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                plan.warnings.push(PlanWarning {
                    path: err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| source_root.to_path_buf()),
                    message: err.to_string(),
                });
                continue;
            }
        };

        let raw = match entry.path().strip_prefix(source_root) {
            Ok(rel) => rel.to_string_lossy().into_owned(),
            Err(_) => continue,
        };
        let Some(rel) = normalize(&raw) else {
            continue;
        };
        let is_dir = entry.file_type().is_dir();

        // Descendant of a wholesale-selected folder: inherit, keep layout.
        if let Some((prefix, rule, dest_root)) = selected_folders
            .iter()
            .find(|(prefix, _, _)| rel.starts_with(&format!("{prefix}/")))
            .cloned()
        {
            if rules.excluded_by(&rel).is_some() {
                continue;
            }
            let remainder = &rel[prefix.len() + 1..];
            let destination = dest_root.join(remainder);
            push_entry(&mut plan, &mut destinations, &rel, destination, is_dir, rule);
            continue;
        }

        let Decision::Selected { rule } = rules.decide(&rel, is_dir) else {
            continue;
        };

        let destination = if config.preserve_structure {
            PathBuf::from(&rel)
        } else {
            let name = rel.rsplit('/').next().unwrap_or(&rel);
            flat_names.claim(name)
        };

        if is_dir {
            selected_folders.push((rel.clone(), rule.clone(), destination.clone()));
        }
        push_entry(&mut plan, &mut destinations, &rel, destination, is_dir, rule);
    }

    Ok(plan)
}

fn push_entry(
    plan: &mut CopyPlan,
    destinations: &mut HashSet<PathBuf>,
    rel: &str,
    destination: PathBuf,
    is_dir: bool,
    rule: String,
) {
    // First selection wins on destination conflicts.
    if !destinations.insert(destination.clone()) {
        return;
    }
    plan.entries.push(CopyPlanEntry {
        source: PathBuf::from(rel),
        destination,
        kind: if is_dir {
            EntryKind::Directory
        } else {
            EntryKind::File
        },
        selected_by: rule,
    });
}

/// Flat-destination name allocator. The first claimant keeps the bare name;
/// later claimants of the same name get a numeric suffix before the
/// extension (`guide.md`, `guide_1.md`, `guide_2.md`).
#[derive(Default)]
struct FlatNames {
    taken: HashSet<String>,
    counters: HashMap<String, u32>,
}

impl FlatNames {
    fn claim(&mut self, name: &str) -> PathBuf {
        if self.taken.insert(name.to_string()) {
            return PathBuf::from(name);
        }
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        loop {
            let counter = self.counters.entry(name.to_string()).or_insert(0);
            *counter += 1;
            let candidate = match ext {
                Some(ext) => format!("{stem}_{counter}.{ext}"),
                None => format!("{stem}_{counter}"),
            };
            if self.taken.insert(candidate.clone()) {
                return PathBuf::from(candidate);
            }
        }
    }
}
