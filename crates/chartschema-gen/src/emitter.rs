//! Serialized access to a non-reentrant generator
//!
//! The generator is owned by an [`Emitter`] behind a mutex; the lock is
//! taken for the whole generation and released on every exit path, panics
//! included. A poisoned lock is recovered because generators reset their
//! state at the start of each call.

use std::sync::{Mutex, PoisonError};

use once_cell::sync::Lazy;

use crate::cue::CueGenerator;
use crate::error::{EmitError, Result};
use crate::generator::Generator;

static GLOBAL: Lazy<Emitter<CueGenerator>> = Lazy::new(|| Emitter::new(CueGenerator::new()));

/// Generator guarded by a mutual-exclusion lock
pub struct Emitter<G> {
    generator: Mutex<G>,
}

impl<G: Generator> Emitter<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator: Mutex::new(generator),
        }
    }

    /// Generate source for `schema_text`, waiting for the generator if busy
    pub fn emit(&self, schema_text: &str, target_name: &str) -> Result<String> {
        let mut generator = self
            .generator
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        tracing::debug!(
            target_name,
            language = generator.language(),
            "generating schema source"
        );
        generator
            .generate(schema_text, target_name)
            .map_err(|source| EmitError::Generation {
                target: target_name.to_string(),
                source,
            })
    }

    /// Consume the emitter and return the generator
    pub fn into_inner(self) -> G {
        self.generator
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Emit CUE source through the process-wide generator
pub fn emit(schema_text: &str, target_name: &str) -> Result<String> {
    GLOBAL.emit(schema_text, target_name)
}
