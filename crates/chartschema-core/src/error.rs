//! Core error types

use thiserror::Error;

/// Pass of the external-schema acceptance pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairPass {
    /// Parsing the document into a schema tree
    Parse,
    /// Dropping `required` names without a declared property
    RequiredRepair,
    /// Applying the fix-up rules
    Fixup,
}

impl std::fmt::Display for RepairPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse => write!(f, "parse"),
            Self::RequiredRepair => write!(f, "required-repair"),
            Self::Fixup => write!(f, "fixup"),
        }
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Values already reference a schema: {reference}")]
    AlreadyAnnotated { reference: String },

    #[error("Failed to decode {format}: {message}")]
    Decode { format: &'static str, message: String },

    #[error("Invalid schema: {message}")]
    SchemaSyntax { message: String },

    #[error("Schema repair failed during {pass} pass: {message}")]
    SemanticRepair { pass: RepairPass, message: String },

    #[error("Fix-up rule failed at {path}: {message}")]
    Fix { path: String, message: String },
}

impl CoreError {
    pub(crate) fn yaml(err: serde_yaml::Error) -> Self {
        Self::Decode {
            format: "YAML",
            message: err.to_string(),
        }
    }

    pub(crate) fn json(err: serde_json::Error) -> Self {
        Self::Decode {
            format: "JSON",
            message: err.to_string(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AlreadyAnnotated { .. } => "already_annotated",
            Self::Decode { .. } => "decode",
            Self::SchemaSyntax { .. } => "schema_syntax",
            Self::SemanticRepair { .. } => "semantic_repair",
            Self::Fix { .. } => "fix",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
