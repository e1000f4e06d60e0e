//! End-to-end properties of the inference, fix-up and merge passes

use chartschema_core::{
    CoreError, InferOptions, SchemaNode, SchemaType, fix_permissive, infer, merge, validate,
    validate_and_fix,
};
use serde_json::json;

const VALUES: &str = r#"
replicaCount: 2
image:
  repository: nginx
  tag: "1.25"
"#;

fn inferred() -> SchemaNode {
    infer(VALUES, &InferOptions::default()).unwrap()
}

fn upstream() -> SchemaNode {
    validate_and_fix(
        br#"{
            "type": "object",
            "properties": {
                "replicaCount": {"type": "integer", "minimum": 1, "default": 1},
                "service": {
                    "type": "object",
                    "properties": {"port": {"type": "integer", "enum": [80, 443]}}
                }
            },
            "anyOf": [{"type": "object", "properties": {"replicaCount": {"maximum": 10}}}]
        }"#,
    )
    .unwrap()
}

#[test]
fn test_round_trip_values_to_fixed_schema() {
    let mut schema = inferred();
    fix_permissive(&mut schema).unwrap();

    assert_eq!(schema.types.as_single(), Some(SchemaType::Object));
    assert_eq!(schema.additional_properties_flag(), Some(true));
    assert_eq!(
        schema.properties["replicaCount"].types.as_single(),
        Some(SchemaType::Integer)
    );

    let image = &schema.properties["image"];
    assert_eq!(image.types.as_single(), Some(SchemaType::Object));
    assert_eq!(image.additional_properties_flag(), Some(true));
    assert_eq!(
        image.properties["repository"].types.as_single(),
        Some(SchemaType::String)
    );
    assert_eq!(image.properties["tag"].default, Some(json!("1.25")));

    let compiled = validate(&schema.to_json().unwrap()).unwrap();
    assert!(compiled.is_valid(&json!({
        "replicaCount": 3,
        "image": {"repository": "redis", "tag": "7", "pullPolicy": "Always"},
        "extra": true
    })));
    assert!(!compiled.is_valid(&json!({"replicaCount": "three", "image": {}})));
}

#[test]
fn test_annotated_values_are_rejected() {
    let yaml = format!("# schema: https://example.com/schema.json\n{VALUES}");
    let result = infer(&yaml, &InferOptions::default());
    assert!(matches!(result, Err(CoreError::AlreadyAnnotated { .. })));
}

#[test]
fn test_fix_idempotent_on_merged_tree() {
    let mut tree = merge(Some(inferred()), Some(upstream()), true).unwrap();
    fix_permissive(&mut tree).unwrap();
    let mut again = tree.clone();
    fix_permissive(&mut again).unwrap();
    assert_eq!(tree, again);
}

#[test]
fn test_merge_identity() {
    let tree = inferred();
    assert_eq!(merge(None, Some(tree.clone()), true), Some(tree.clone()));
    assert_eq!(merge(Some(tree.clone()), None, false), Some(tree));
}

#[test]
fn test_merge_concatenates_enum_across_chain() {
    let with_enum = |values: &[i64]| {
        let mut node = SchemaNode::typed(SchemaType::Integer);
        node.enum_values = values.iter().map(|v| json!(v)).collect();
        node
    };
    let a = with_enum(&[1, 2]);
    let b = with_enum(&[3]);
    let c = with_enum(&[2, 4]);

    let merged = merge(merge(Some(a), Some(b), false), Some(c), false).unwrap();
    assert_eq!(
        merged.enum_values,
        vec![json!(1), json!(2), json!(3), json!(2), json!(4)]
    );
}

#[test]
fn test_default_propagation_gating() {
    let without = merge(Some(inferred()), Some(upstream()), false).unwrap();
    assert_eq!(
        without.properties["replicaCount"].default,
        Some(json!(2))
    );

    let with = merge(Some(inferred()), Some(upstream()), true).unwrap();
    assert_eq!(with.properties["replicaCount"].default, Some(json!(1)));
}

#[test]
fn test_merge_collapses_combinators() {
    let merged = merge(Some(inferred()), Some(upstream()), true).unwrap();
    assert!(merged.all_of.is_empty());
    assert!(merged.any_of.is_empty());
    assert!(merged.one_of.is_empty());

    let items = merged.items.as_deref().unwrap();
    assert_eq!(
        items.properties["replicaCount"].maximum,
        Some(serde_json::Number::from(10))
    );

    let service = &merged.properties["service"];
    assert_eq!(
        service.properties["port"].enum_values,
        vec![json!(80), json!(443)]
    );
    assert_eq!(
        merged.properties["replicaCount"].minimum,
        Some(serde_json::Number::from(1))
    );
}

#[test]
fn test_merged_tree_compiles() {
    let mut merged = merge(Some(inferred()), Some(upstream()), true).unwrap();
    fix_permissive(&mut merged).unwrap();
    let text = merged.to_json_pretty().unwrap();
    let compiled = validate(&text).unwrap();
    assert!(compiled.is_valid(&json!({
        "replicaCount": 2,
        "image": {"repository": "nginx", "tag": "1.25"},
        "service": {"port": 443}
    })));
    assert!(!compiled.is_valid(&json!({
        "replicaCount": 0,
        "image": {"repository": "nginx", "tag": "1.25"}
    })));
}

fn assert_accepts_own_values(yaml: &str) {
    let mut schema = infer(yaml, &InferOptions::default()).unwrap();
    fix_permissive(&mut schema).unwrap();
    let compiled = validate(&schema.to_json().unwrap()).unwrap();

    let values: serde_json::Value = serde_yaml::from_str(yaml).unwrap();
    let result = compiled.validate(&values);
    assert!(result.is_valid, "values rejected: {:?}", result.errors);
}

#[test]
fn test_inferred_schema_accepts_its_values() {
    assert_accepts_own_values(VALUES);
    assert_accepts_own_values("hosts:\n  - tls:\n      a: 1\n  - tls:\n      b: 2\n");
    assert_accepts_own_values("ports:\n  - port: 80\n  - port: http\n");
    assert_accepts_own_values(
        r#"
ingress:
  rules:
    - host: a.example
      paths:
        - path: /
          backend: {service: {name: web, port: 80}}
    - host: b.example
      paths:
        - path: /api
          backend: {service: {name: api, port: grpc}}
        - path: 7
    - plain
matrix:
  - [1, "one"]
  - [true]
"#,
    );
}
