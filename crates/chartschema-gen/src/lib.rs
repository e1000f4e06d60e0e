//! chartschema Gen - Schema source emission
//!
//! This crate turns serialized schema documents into target-language source:
//! - `Generator`: A code generator for one target language (not reentrant)
//! - `CueGenerator`: The bundled CUE generator
//! - `Emitter`: Serializes every call to a generator behind one lock
//! - `emit`: The process-wide CUE emitter
//!
//! Emission is the only serialized stage of the schema pipeline; inference,
//! fix-up, merge and validation run concurrently.

pub mod cue;
pub mod emitter;
pub mod error;
pub mod generator;

pub use cue::{CueGenerator, MAX_DEPTH, definition_name};
pub use emitter::{Emitter, emit};
pub use error::{EmitError, GeneratorError, Result};
pub use generator::Generator;
