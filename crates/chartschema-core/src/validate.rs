//! Schema compilation and acceptance of external schema documents

use serde_json::Value as JsonValue;

use crate::error::{CoreError, RepairPass, Result};
use crate::fix::{PermissiveObjects, Rule, fix};
use crate::node::SchemaNode;

/// A schema document that compiled against the draft-07 grammar
pub struct CompiledSchema {
    document: JsonValue,
    compiled: jsonschema::Validator,
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("document", &self.document)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// The compiled document
    pub fn document(&self) -> &JsonValue {
        &self.document
    }

    /// Pretty JSON bytes for downstream tooling
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.document).map_err(CoreError::json)
    }

    /// Parse the document into a schema tree
    pub fn to_node(&self) -> Result<SchemaNode> {
        serde_json::from_value(self.document.clone()).map_err(CoreError::json)
    }

    pub fn is_valid(&self, values: &JsonValue) -> bool {
        self.compiled.is_valid(values)
    }

    /// Validate values against the schema
    pub fn validate(&self, values: &JsonValue) -> ValidationResult {
        if self.compiled.is_valid(values) {
            return ValidationResult::success();
        }

        let errors = self
            .compiled
            .iter_errors(values)
            .map(|e| {
                let path = e.instance_path.to_string();
                ValidationErrorInfo {
                    path: if path.is_empty() {
                        "(root)".to_string()
                    } else {
                        path
                    },
                    message: e.to_string().replace('"', "'"),
                }
            })
            .collect();

        ValidationResult::failure(errors)
    }
}

/// One failed check when validating values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorInfo {
    /// JSON pointer of the offending value, `(root)` for the document
    pub path: String,
    pub message: String,
}

/// Result of validating values against a compiled schema
#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationErrorInfo>,
}

impl ValidationResult {
    pub fn success() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn failure(errors: Vec<ValidationErrorInfo>) -> Self {
        Self {
            is_valid: false,
            errors,
        }
    }
}

/// Decode JSON or YAML schema text
fn decode_document(text: &str) -> Result<JsonValue> {
    if text.trim_start().starts_with('{') {
        serde_json::from_str(text).map_err(CoreError::json)
    } else {
        serde_yaml::from_str(text).map_err(CoreError::yaml)
    }
}

/// Compile schema text against the draft-07 grammar
pub fn validate(schema_text: &str) -> Result<CompiledSchema> {
    let document = decode_document(schema_text)?;
    let compiled = jsonschema::validator_for(&document).map_err(|e| CoreError::SchemaSyntax {
        message: e.to_string(),
    })?;
    Ok(CompiledSchema { document, compiled })
}

/// Accept an externally authored schema with the permissive policy
pub fn validate_and_fix(schema_bytes: &[u8]) -> Result<SchemaNode> {
    validate_and_fix_with(schema_bytes, &PermissiveObjects)
}

/// Accept an externally authored schema
///
/// The document must compile; it is then parsed into a tree, stripped of
/// `required` names that have no matching property, and fixed up with
/// `rule`.
pub fn validate_and_fix_with(schema_bytes: &[u8], rule: &dyn Rule) -> Result<SchemaNode> {
    let text = std::str::from_utf8(schema_bytes).map_err(|e| CoreError::Decode {
        format: "UTF-8",
        message: e.to_string(),
    })?;
    let compiled = validate(text)?;

    let mut node = compiled.to_node().map_err(|e| CoreError::SemanticRepair {
        pass: RepairPass::Parse,
        message: e.to_string(),
    })?;

    fix(&mut node, &DanglingRequired).map_err(|e| CoreError::SemanticRepair {
        pass: RepairPass::RequiredRepair,
        message: e.to_string(),
    })?;

    fix(&mut node, rule).map_err(|e| CoreError::SemanticRepair {
        pass: RepairPass::Fixup,
        message: e.to_string(),
    })?;

    Ok(node)
}

/// Drops `required` names without a declared property
struct DanglingRequired;

impl Rule for DanglingRequired {
    fn apply(&self, node: &mut SchemaNode, path: &str) -> std::result::Result<(), String> {
        let properties = &node.properties;
        node.required.retain(|name| {
            let declared = properties.contains_key(name);
            if !declared {
                tracing::warn!(path, property = %name, "dropping required property that is not declared");
            }
            declared
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validate_compiles_json_and_yaml() {
        let json_text = r#"{"type": "object", "properties": {"a": {"type": "integer"}}}"#;
        assert!(validate(json_text).is_ok());

        let yaml_text = "type: object\nproperties:\n  a:\n    type: integer\n";
        let compiled = validate(yaml_text).unwrap();
        assert!(compiled.is_valid(&json!({"a": 1})));
        assert!(!compiled.is_valid(&json!({"a": "x"})));
    }

    #[test]
    fn test_invalid_pattern_is_syntax_error() {
        let text = r#"{"type": "object", "properties": {"a": {"pattern": "(unclosed"}}}"#;
        let err = validate(text).unwrap_err();
        assert!(matches!(err, CoreError::SchemaSyntax { .. }));
    }

    #[test]
    fn test_malformed_text_is_decode_error() {
        let err = validate("{\"type\": ").unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_validation_result_reports_paths() {
        let compiled = validate(
            r#"{"type": "object", "properties": {"replicas": {"type": "integer"}}}"#,
        )
        .unwrap();

        let ok = compiled.validate(&json!({"replicas": 3}));
        assert!(ok.is_valid);

        let bad = compiled.validate(&json!({"replicas": "three"}));
        assert!(!bad.is_valid);
        assert_eq!(bad.errors[0].path, "/replicas");

        let root = compiled.validate(&json!("nope"));
        assert_eq!(root.errors[0].path, "(root)");
    }

    #[test]
    fn test_validate_and_fix_repairs_required() {
        let text = br#"{
            "type": "object",
            "required": ["name", "ghost"],
            "properties": {
                "name": {"type": "string"},
                "nested": {
                    "type": "object",
                    "required": ["missing"],
                    "properties": {"x": {"type": "integer"}}
                }
            }
        }"#;

        let node = validate_and_fix(text).unwrap();
        assert_eq!(node.required, vec!["name"]);
        let nested = &node.properties["nested"];
        assert!(nested.required.is_empty());
        assert_eq!(node.additional_properties_flag(), Some(true));
        assert_eq!(nested.additional_properties_flag(), Some(true));
    }

    #[test]
    fn test_validate_and_fix_reports_failing_pass() {
        let failing = |_: &mut SchemaNode, _: &str| -> std::result::Result<(), String> {
            Err("rejected".to_string())
        };
        let err = validate_and_fix_with(br#"{"type": "object"}"#, &failing).unwrap_err();
        assert!(matches!(
            err,
            CoreError::SemanticRepair {
                pass: RepairPass::Fixup,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_and_fix_parse_pass() {
        // Tuple-form items compile but are outside the supported subset
        let err = validate_and_fix(br#"{"items": [{"type": "string"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            CoreError::SemanticRepair {
                pass: RepairPass::Parse,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_and_fix_rejects_non_utf8() {
        let err = validate_and_fix(&[0xff, 0xfe]).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
