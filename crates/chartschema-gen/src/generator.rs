//! Code generator abstraction

use crate::error::GeneratorError;

/// Source generator for one target schema language
///
/// Implementations may keep state across calls and are not required to be
/// reentrant. Callers go through [`Emitter`](crate::Emitter), which
/// serializes every call.
pub trait Generator: Send {
    /// Name of the target language, for logs
    fn language(&self) -> &'static str;

    /// Generate source text for a serialized schema
    ///
    /// `target_name` is the logical name of the configuration unit and is
    /// used to derive the emitted symbol.
    fn generate(&mut self, schema_text: &str, target_name: &str)
    -> Result<String, GeneratorError>;
}
