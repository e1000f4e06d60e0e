//! Pipeline error types with diagnostic hints

use chartschema_core::CoreError;
use chartschema_gen::EmitError;
use miette::Diagnostic;
use thiserror::Error;

/// Step of the per-unit pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Infer,
    Fix,
    /// Acceptance of the upstream schema before it is merged
    Upstream,
    Validate,
    Emit,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Infer => write!(f, "infer"),
            Self::Fix => write!(f, "fix"),
            Self::Upstream => write!(f, "upstream"),
            Self::Validate => write!(f, "validate"),
            Self::Emit => write!(f, "emit"),
        }
    }
}

/// Underlying cause of a stage failure
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

#[derive(Error, Debug, Diagnostic)]
pub enum PipelineError {
    #[error("{unit}: {stage} stage failed: {source}")]
    #[diagnostic(code(chartschema::pipeline::stage))]
    Stage {
        unit: String,
        stage: Stage,
        #[source]
        source: StageError,
        #[help]
        help: Option<String>,
    },

    #[error("{unit}: emission task did not complete: {message}")]
    #[diagnostic(code(chartschema::pipeline::task))]
    Task { unit: String, message: String },

    #[error("Invalid configuration in {path}: {message}")]
    #[diagnostic(
        code(chartschema::pipeline::config),
        help("Keys are camelCase: stripComments, skipRequired, skipAdditionalProperties, setDefaults, policy, checkPatterns")
    )]
    Config { path: String, message: String },
}

impl PipelineError {
    pub(crate) fn stage(unit: &str, stage: Stage, source: impl Into<StageError>) -> Self {
        let source = source.into();
        let help = help_for(&source);
        Self::Stage {
            unit: unit.to_string(),
            stage,
            source,
            help,
        }
    }

    /// Unit the failure belongs to, if any
    pub fn unit(&self) -> Option<&str> {
        match self {
            Self::Stage { unit, .. } | Self::Task { unit, .. } => Some(unit),
            Self::Config { .. } => None,
        }
    }

    /// Stage that failed, for stage errors
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::Task { .. } => Some(Stage::Emit),
            Self::Config { .. } => None,
        }
    }
}

fn help_for(source: &StageError) -> Option<String> {
    let hint = match source {
        StageError::Core(CoreError::AlreadyAnnotated { .. }) => {
            "Remove the schema comment from values.yaml or pass that schema as the upstream schema"
        }
        StageError::Core(CoreError::Decode { .. }) => "Check the file for YAML/JSON syntax errors",
        StageError::Core(CoreError::SchemaSyntax { .. }) => {
            "The schema does not conform to JSON Schema draft-07"
        }
        StageError::Core(CoreError::SemanticRepair { .. }) => {
            "Tuple-form `items` and non-schema subschemas are not supported"
        }
        StageError::Core(CoreError::Fix { .. }) => {
            "A fix-up rule rejected the schema at the reported path"
        }
        StageError::Emit(_) => return None,
    };
    Some(hint.to_string())
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_attribution() {
        let err = PipelineError::stage(
            "chart-x",
            Stage::Infer,
            CoreError::AlreadyAnnotated {
                reference: "values.schema.json".to_string(),
            },
        );
        assert_eq!(err.unit(), Some("chart-x"));
        assert_eq!(err.failed_stage(), Some(Stage::Infer));

        let message = err.to_string();
        assert!(message.starts_with("chart-x: infer stage failed"));
        assert!(message.contains("values.schema.json"));
        assert!(err.help().is_some());
    }

    #[test]
    fn test_config_error_has_no_unit() {
        let err = PipelineError::Config {
            path: "pipeline.yaml".to_string(),
            message: "bad".to_string(),
        };
        assert_eq!(err.unit(), None);
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("chartschema::pipeline::config")
        );
    }
}
