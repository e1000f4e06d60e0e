//! Pipeline configuration
//!
//! Read from a YAML file such as `chartschema.yaml`; every key is optional.

use std::path::Path;

use chartschema_core::{Chain, FixPolicy, InferOptions, ruleset};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Ignore comments in values files
    pub strip_comments: bool,

    /// Do not generate `required` lists
    pub skip_required: bool,

    /// Do not close inferred objects with `additionalProperties: false`
    pub skip_additional_properties: bool,

    /// Let the upstream schema's `default` override the inferred one
    pub set_defaults: bool,

    /// Fix-up rule selection
    pub policy: FixPolicy,

    /// Reject `pattern` and `patternProperties` regexes that do not compile
    pub check_patterns: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strip_comments: false,
            skip_required: false,
            skip_additional_properties: false,
            set_defaults: true,
            policy: FixPolicy::default(),
            check_patterns: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>")
    }

    fn parse(text: &str, origin: &str) -> Result<Self> {
        // An empty file deserializes to unit, not to a mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| PipelineError::Config {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn infer_options(&self) -> InferOptions {
        InferOptions {
            strip_comments: self.strip_comments,
            skip_required: self.skip_required,
            skip_additional_properties: self.skip_additional_properties,
        }
    }

    /// Fix-up rules selected by `policy` and `checkPatterns`
    pub fn rules(&self) -> Chain {
        ruleset(self.policy, self.check_patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(config.set_defaults);
        assert!(!config.skip_required);
        assert_eq!(config.policy, FixPolicy::Permissive);
        assert_eq!(config.rules().len(), 1);
    }

    #[test]
    fn test_partial_yaml() {
        let config = PipelineConfig::from_yaml("skipRequired: true\npolicy: closed\n").unwrap();
        assert!(config.skip_required);
        assert!(config.set_defaults);
        assert_eq!(config.policy, FixPolicy::Closed);

        let options = config.infer_options();
        assert!(options.skip_required);
        assert!(!options.strip_comments);
    }

    #[test]
    fn test_check_patterns_extends_rules() {
        let config = PipelineConfig::from_yaml("checkPatterns: true").unwrap();
        assert_eq!(config.rules().len(), 2);
    }

    #[test]
    fn test_empty_text_is_default() {
        assert_eq!(
            PipelineConfig::from_yaml("\n").unwrap(),
            PipelineConfig::default()
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "stripComments: true").unwrap();
        writeln!(file, "setDefaults: false").unwrap();

        let config = PipelineConfig::load_from(file.path()).unwrap();
        assert!(config.strip_comments);
        assert!(!config.set_defaults);
    }

    #[test]
    fn test_invalid_policy_names_origin() {
        let err = PipelineConfig::from_yaml("policy: strictest").unwrap_err();
        match err {
            PipelineError::Config { path, .. } => assert_eq!(path, "<inline>"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::load_from(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }
}
