//! Merge pipeline configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Selection strategy for the file-selection step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyMode {
    /// Select individual files by pattern; folder paths are ignored.
    Files,
    /// Select whole folders by path; file patterns are ignored.
    Folders,
    /// Union of both, de-duplicated by destination.
    Mixed,
}

/// Input for one pipeline run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfiguration {
    pub source_repo: String,
    pub source_credential: String,
    pub target_repo: String,
    pub target_credential: String,
    pub target_branch: String,
    pub base_branch: String,
    pub copy_mode: CopyMode,
    #[serde(default)]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub folder_paths: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_preserve_structure")]
    pub preserve_structure: bool,
    pub merge_request_title: String,
    #[serde(default)]
    pub merge_request_description: String,
    pub commit_message: String,
}

fn default_preserve_structure() -> bool {
    true
}

/// Configuration rejected before a run is created.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("copy mode `files` requires at least one file pattern")]
    NoFilePatterns,
    #[error("copy mode `folders` requires at least one folder path")]
    NoFolderPaths,
    #[error("copy mode `mixed` requires at least one file pattern or folder path")]
    NoSelectionRules,
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl MergeConfiguration {
    /// Validates the configuration. Rejected configurations never enter the
    /// state machine; the copy mode constrains which selection fields are
    /// meaningful.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let required = [
            ("source_repo", &self.source_repo),
            ("target_repo", &self.target_repo),
            ("target_branch", &self.target_branch),
            ("base_branch", &self.base_branch),
            ("merge_request_title", &self.merge_request_title),
            ("commit_message", &self.commit_message),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigurationError::MissingField(name));
            }
        }

        match self.copy_mode {
            CopyMode::Files if self.file_patterns.is_empty() => {
                return Err(ConfigurationError::NoFilePatterns);
            }
            CopyMode::Folders if self.folder_paths.is_empty() => {
                return Err(ConfigurationError::NoFolderPaths);
            }
            CopyMode::Mixed if self.file_patterns.is_empty() && self.folder_paths.is_empty() => {
                return Err(ConfigurationError::NoSelectionRules);
            }
            _ => {}
        }

        for pattern in self.file_patterns.iter().chain(&self.exclude_patterns) {
            globset::Glob::new(pattern).map_err(|e| ConfigurationError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config(mode: CopyMode) -> MergeConfiguration {
        MergeConfiguration {
            source_repo: "https://example.com/src.git".to_string(),
            source_credential: "token-a".to_string(),
            target_repo: "https://example.com/dst.git".to_string(),
            target_credential: "token-b".to_string(),
            target_branch: "merge/docs".to_string(),
            base_branch: "main".to_string(),
            copy_mode: mode,
            file_patterns: vec!["*.md".to_string()],
            folder_paths: vec!["docs".to_string()],
            exclude_patterns: vec![],
            preserve_structure: true,
            merge_request_title: "Merge docs".to_string(),
            merge_request_description: String::new(),
            commit_message: "Import docs".to_string(),
        }
    }

    #[test]
    fn test_valid_configuration() {
        assert!(base_config(CopyMode::Files).validate().is_ok());
        assert!(base_config(CopyMode::Folders).validate().is_ok());
        assert!(base_config(CopyMode::Mixed).validate().is_ok());
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut config = base_config(CopyMode::Files);
        config.target_branch = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingField("target_branch"))
        ));
    }

    #[test]
    fn test_files_mode_requires_patterns() {
        let mut config = base_config(CopyMode::Files);
        config.file_patterns.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NoFilePatterns)
        ));
    }

    #[test]
    fn test_folders_mode_requires_paths() {
        let mut config = base_config(CopyMode::Folders);
        config.folder_paths.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NoFolderPaths)
        ));
    }

    #[test]
    fn test_mixed_mode_requires_any_rule() {
        let mut config = base_config(CopyMode::Mixed);
        config.file_patterns.clear();
        config.folder_paths.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::NoSelectionRules)
        ));
    }

    #[test]
    fn test_malformed_pattern_rejected() {
        let mut config = base_config(CopyMode::Files);
        config.file_patterns = vec!["src/{a,b".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidPattern { .. })
        ));
    }
}
