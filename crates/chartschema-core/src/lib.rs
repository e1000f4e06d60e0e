//! chartschema Core - Schema pipeline for Helm values
//!
//! This crate turns `values.yaml` files into JSON Schema trees:
//! - `SchemaNode`: The schema tree all passes operate on
//! - `infer`: Structural inference from values data
//! - `fix`: Normalization pass (permissive `additionalProperties` by default)
//! - `merge`: Deep merge of two schema trees
//! - `validate`: Compilation against the draft-07 grammar and acceptance of
//!   externally authored schemas
//!
//! Every pass is pure with respect to shared state and can run
//! concurrently for independent trees.

pub mod comments;
pub mod error;
pub mod fix;
pub mod infer;
pub mod merge;
pub mod node;
pub mod validate;

pub use comments::{CommentMap, NodeComments, find_schema_reference};
pub use error::{CoreError, RepairPass, Result};
pub use fix::{
    Chain, ClosedObjects, FixPolicy, PatternCheck, PermissiveObjects, Rule, fix, fix_permissive,
    ruleset,
};
pub use infer::{InferOptions, infer};
pub use merge::merge;
pub use node::{AdditionalProperties, DRAFT_07, SchemaNode, SchemaType, TypeSet};
pub use validate::{
    CompiledSchema, ValidationErrorInfo, ValidationResult, validate, validate_and_fix,
    validate_and_fix_with,
};
