//! chartschema Pipeline - Per-chart orchestration
//!
//! Runs the core passes and the emitter for configuration units:
//! - `KeyedLocks`: one reader/writer lock per unit name
//! - `Pipeline`: infer, fix, merge with an upstream schema, validate, emit
//! - `PipelineConfig`: YAML configuration of the passes
//! - `init_logging`: stderr tracing subscriber

pub mod config;
pub mod coordinator;
pub mod error;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use coordinator::{KeyReadGuard, KeyWriteGuard, KeyedLocks};
pub use error::{PipelineError, Result, Stage, StageError};
pub use logging::{LogConfig, init_logging};
pub use pipeline::{Pipeline, UnitInput, UnitOutput};
