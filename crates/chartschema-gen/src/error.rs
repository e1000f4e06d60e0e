//! Emission error types

use thiserror::Error;

/// Failure reported by a code generator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Failed to decode schema: {message}")]
    Decode { message: String },

    #[error("Invalid target name {name:?}: {reason}")]
    InvalidTarget { name: String, reason: String },

    #[error("Schema nesting exceeds {limit} levels")]
    DepthExceeded { limit: usize },
}

/// Failure of an emit call, naming the target
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmitError {
    #[error("Failed to generate source for {target}: {source}")]
    Generation {
        target: String,
        source: GeneratorError,
    },
}

impl EmitError {
    /// Target the failed call was generating
    pub fn target(&self) -> &str {
        match self {
            Self::Generation { target, .. } => target,
        }
    }
}

pub type Result<T> = std::result::Result<T, EmitError>;
