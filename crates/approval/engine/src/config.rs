//! Engine configuration

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which stage reject and withdraw-in-approvals send an application back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStageRule {
    /// The first stage of the workflow version, whatever its type
    #[default]
    FirstStage,
    /// The first form submission stage of the workflow version
    FirstFormSubmission,
}

/// Approval engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Destination for reject and withdraw-in-approvals
    pub return_stage: ReturnStageRule,

    /// Whether reject also supersedes the decisions already made in the
    /// stage, as reset does
    pub supersede_on_reject: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            return_stage: ReturnStageRule::FirstStage,
            supersede_on_reject: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> EngineResult<Self> {
        toml::from_str(contents).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.return_stage, ReturnStageRule::FirstStage);
        assert!(!config.supersede_on_reject);
    }

    #[test]
    fn test_parse_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            return_stage = "first_form_submission"
            supersede_on_reject = true
            "#,
        )
        .unwrap();
        assert_eq!(config.return_stage, ReturnStageRule::FirstFormSubmission);
        assert!(config.supersede_on_reject);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EngineConfig::from_toml_str("supersede_on_reject = true").unwrap();
        assert_eq!(config.return_stage, ReturnStageRule::FirstStage);
    }

    #[test]
    fn test_invalid_toml() {
        let err = EngineConfig::from_toml_str("return_stage = \"somewhere\"").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_load_missing_config() {
        let config = EngineConfig::load("/nonexistent/path/approval.toml").unwrap();
        assert!(!config.supersede_on_reject);
    }
}
