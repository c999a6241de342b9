//! Pattern matcher
//!
//! Compiles a configuration's include/exclude rules into glob sets and
//! decides whether a candidate relative path is selected. Pure and
//! deterministic; no file-system access.
//!
//! Glob syntax: `*` matches within one path segment, `**` across segments,
//! `{a,b}` alternation. A pattern without a `/` is matched against the file
//! name of the candidate, one with a `/` against its full relative path.
//! Folder rules are plain relative paths matched on segment boundaries.
//! Matching is case-sensitive; `\` separators are normalized to `/`; a path
//! escaping the copy root is rejected, never a panic. Exclusion always wins.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::domain::config::{CopyMode, MergeConfiguration};
use crate::selection::SelectionError;

/// Selection decision with the matching rule for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Selected { rule: String },
    Rejected,
}

/// A pattern list compiled into a glob set, split by whether patterns carry
/// a path separator (full-path match) or not (file-name match).
struct CompiledPatterns {
    path_set: GlobSet,
    path_patterns: Vec<String>,
    name_set: GlobSet,
    name_patterns: Vec<String>,
}

impl CompiledPatterns {
    fn new(patterns: &[String]) -> Result<Self, SelectionError> {
        let mut path_builder = GlobSetBuilder::new();
        let mut name_builder = GlobSetBuilder::new();
        let mut path_patterns = Vec::new();
        let mut name_patterns = Vec::new();

        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .case_insensitive(false)
                .build()
                .map_err(|e| SelectionError::Pattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            if pattern.contains('/') {
                path_builder.add(glob);
                path_patterns.push(pattern.clone());
            } else {
                name_builder.add(glob);
                name_patterns.push(pattern.clone());
            }
        }

        let compile = |builder: GlobSetBuilder, patterns: &[String]| {
            builder.build().map_err(|e| SelectionError::Pattern {
                pattern: patterns.join(","),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            path_set: compile(path_builder, &path_patterns)?,
            path_patterns,
            name_set: compile(name_builder, &name_patterns)?,
            name_patterns,
        })
    }

    /// First matching pattern for a normalized relative path, if any.
    fn matched(&self, rel_path: &str) -> Option<&str> {
        if let Some(idx) = self.path_set.matches(rel_path).into_iter().next() {
            return Some(&self.path_patterns[idx]);
        }
        let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        self.name_set
            .matches(name)
            .into_iter()
            .next()
            .map(|idx| self.name_patterns[idx].as_str())
    }
}

/// Compiled rule set for one configuration
pub struct RuleSet {
    mode: CopyMode,
    includes: CompiledPatterns,
    excludes: CompiledPatterns,
    folders: Vec<String>,
}

impl RuleSet {
    pub fn new(config: &MergeConfiguration) -> Result<Self, SelectionError> {
        let folders = config
            .folder_paths
            .iter()
            .filter_map(|p| normalize(p))
            .collect();
        Ok(Self {
            mode: config.copy_mode,
            includes: CompiledPatterns::new(&config.file_patterns)?,
            excludes: CompiledPatterns::new(&config.exclude_patterns)?,
            folders,
        })
    }

    pub fn mode(&self) -> CopyMode {
        self.mode
    }

    /// Exclude pattern matching the path, if any. Checked first everywhere:
    /// exclusion takes precedence over every include rule.
    pub fn excluded_by(&self, rel_path: &str) -> Option<&str> {
        self.excludes.matched(rel_path)
    }

    /// File pattern matching the path, if any.
    pub fn file_rule(&self, rel_path: &str) -> Option<&str> {
        self.includes.matched(rel_path)
    }

    /// Folder rule whose path equals the candidate directory, if any.
    /// Descendants of a matched folder are not re-matched; the planner
    /// carries the selection down the subtree.
    pub fn folder_rule(&self, rel_path: &str) -> Option<&str> {
        self.folders
            .iter()
            .find(|f| f.as_str() == rel_path)
            .map(String::as_str)
    }

    /// Mode-dispatched decision for one candidate path.
    pub fn decide(&self, raw_path: &str, is_dir: bool) -> Decision {
        let Some(rel) = normalize(raw_path) else {
            return Decision::Rejected;
        };
        if self.excluded_by(&rel).is_some() {
            return Decision::Rejected;
        }

        let file_match = || self.file_rule(&rel).map(str::to_string);
        let folder_match = || self.folder_rule(&rel).map(str::to_string);

        let rule = match self.mode {
            CopyMode::Files if !is_dir => file_match(),
            CopyMode::Folders if is_dir => folder_match(),
            CopyMode::Mixed => {
                if is_dir {
                    folder_match()
                } else {
                    file_match()
                }
            }
            _ => None,
        };

        match rule {
            Some(rule) => Decision::Selected { rule },
            None => Decision::Rejected,
        }
    }
}

/// Normalizes a candidate path: `\` to `/`, strips `./` segments and
/// duplicate separators, and resolves `..` lexically. Returns `None` when
/// the path is absolute or escapes the root.
pub fn normalize(path: &str) -> Option<String> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || looks_like_windows_absolute(&unified) {
        return None;
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return None;
                }
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn looks_like_windows_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}
