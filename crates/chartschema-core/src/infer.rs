//! Schema inference from values.yaml
//!
//! Walks the parsed YAML depth first:
//! - mappings become `object` nodes with one property per key
//! - sequences become `array` nodes whose `items` joins every element
//!   schema: types are unioned and only keys present in every object
//!   element stay required, at every depth
//! - scalars become nodes typed from the YAML scalar, with the literal
//!   value as `default`
//!
//! Comments directly above a key become its `description`; a trailing
//! comment on the key line becomes its `title`.
//!
//! # Example
//!
//! ```rust
//! use chartschema_core::{infer, InferOptions, SchemaType};
//!
//! let yaml = "replicaCount: 2\nimage:\n  repository: nginx\n";
//! let schema = infer(yaml, &InferOptions::default()).unwrap();
//! assert_eq!(
//!     schema.properties["replicaCount"].types.as_single(),
//!     Some(SchemaType::Integer)
//! );
//! ```

use serde_json::Value as JsonValue;
use serde_yaml::Value;

use crate::comments::{CommentMap, ITEM_SEGMENT, find_schema_reference};
use crate::error::{CoreError, Result};
use crate::node::{AdditionalProperties, SchemaNode, SchemaType};

/// Switches controlling inference output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferOptions {
    /// Ignore comments instead of turning them into titles/descriptions
    pub strip_comments: bool,
    /// Never mark properties as required
    pub skip_required: bool,
    /// Leave `additionalProperties` unset on objects
    pub skip_additional_properties: bool,
}

/// Infer a schema from raw values text
///
/// Fails with [`CoreError::AlreadyAnnotated`] if the document already
/// carries a schema reference comment, and with [`CoreError::Decode`] if it
/// is not valid YAML.
pub fn infer(text: &str, options: &InferOptions) -> Result<SchemaNode> {
    if let Some(reference) = find_schema_reference(text) {
        return Err(CoreError::AlreadyAnnotated { reference });
    }

    let value: Value = serde_yaml::from_str(text).map_err(CoreError::yaml)?;

    let comments = if options.strip_comments {
        CommentMap::default()
    } else {
        CommentMap::parse(text)
    };
    tracing::debug!(comments = comments.len(), "inferring schema from values");

    let inferrer = Inferrer {
        options,
        comments: &comments,
    };
    let mut path = Vec::new();
    let root = match &value {
        // An empty values file is an empty object
        Value::Null => inferrer.infer_mapping(&serde_yaml::Mapping::new(), &mut path),
        other => inferrer.infer_value(other, &mut path),
    };
    Ok(root)
}

struct Inferrer<'a> {
    options: &'a InferOptions,
    comments: &'a CommentMap,
}

impl Inferrer<'_> {
    fn infer_value(&self, value: &Value, path: &mut Vec<String>) -> SchemaNode {
        match value {
            Value::Null => SchemaNode::scalar(SchemaType::Null, JsonValue::Null),
            Value::Bool(b) => SchemaNode::scalar(SchemaType::Boolean, JsonValue::Bool(*b)),
            Value::Number(n) => infer_number(n),
            Value::String(s) => SchemaNode::scalar(SchemaType::String, JsonValue::String(s.clone())),
            Value::Sequence(seq) => self.infer_sequence(seq, path),
            Value::Mapping(map) => self.infer_mapping(map, path),
            Value::Tagged(tagged) => self.infer_value(&tagged.value, path),
        }
    }

    fn infer_mapping(&self, map: &serde_yaml::Mapping, path: &mut Vec<String>) -> SchemaNode {
        let mut node = SchemaNode::object();

        for (key, child) in map {
            let name = key_to_string(key);
            path.push(name.clone());
            let mut child_node = self.infer_value(child, path);
            self.annotate(&mut child_node, path);
            path.pop();

            if !self.options.skip_required && !node.required.contains(&name) {
                node.required.push(name.clone());
            }
            node.properties.insert(name, child_node);
        }

        if !self.options.skip_additional_properties {
            node.additional_properties = Some(AdditionalProperties::Allowed(false));
        }
        node
    }

    fn infer_sequence(&self, seq: &[Value], path: &mut Vec<String>) -> SchemaNode {
        path.push(ITEM_SEGMENT.to_string());
        let items = seq
            .iter()
            .map(|element| self.infer_value(element, path))
            .reduce(join_elements);
        path.pop();

        SchemaNode::array(items.map(|mut node| {
            clear_defaults(&mut node);
            node
        }))
    }

    fn annotate(&self, node: &mut SchemaNode, path: &[String]) {
        let Some(comments) = self.comments.get(path) else {
            return;
        };
        if let Some(head) = &comments.head {
            node.description = Some(head.clone());
        }
        if let Some(inline) = &comments.inline {
            node.title = Some(inline.clone());
        }
    }
}

/// Schema accepting every value either element schema accepts
///
/// Types are unioned and `required` keeps only the keys every object
/// element has, at every nesting level. Titles and descriptions come from
/// the first element that has them.
fn join_elements(mut acc: SchemaNode, next: SchemaNode) -> SchemaNode {
    match (
        acc.types.contains(SchemaType::Object),
        next.types.contains(SchemaType::Object),
    ) {
        (true, true) => acc.required.retain(|key| next.required.contains(key)),
        (false, true) => acc.required = next.required,
        _ => {}
    }
    acc.types.extend(&next.types);

    if acc.title.is_none() {
        acc.title = next.title;
    }
    if acc.description.is_none() {
        acc.description = next.description;
    }
    if acc.additional_properties.is_none() {
        acc.additional_properties = next.additional_properties;
    }

    for (key, child) in next.properties {
        match acc.properties.get_mut(&key) {
            Some(existing) => {
                let current = std::mem::take(existing);
                *existing = join_elements(current, child);
            }
            None => {
                acc.properties.insert(key, child);
            }
        }
    }

    acc.items = match (acc.items.take(), next.items) {
        (Some(left), Some(right)) => Some(Box::new(join_elements(*left, *right))),
        (left, right) => left.or(right),
    };
    acc
}

/// One element's literal is not a default for all of them
fn clear_defaults(node: &mut SchemaNode) {
    node.default = None;
    for child in node.properties.values_mut() {
        clear_defaults(child);
    }
    if let Some(items) = node.items.as_deref_mut() {
        clear_defaults(items);
    }
}

fn infer_number(n: &serde_yaml::Number) -> SchemaNode {
    if let Some(i) = n.as_i64() {
        SchemaNode::scalar(SchemaType::Integer, JsonValue::from(i))
    } else if let Some(u) = n.as_u64() {
        SchemaNode::scalar(SchemaType::Integer, JsonValue::from(u))
    } else {
        let mut node = SchemaNode::typed(SchemaType::Number);
        // NaN and infinities have no JSON form
        node.default = n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(JsonValue::Number);
        node
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
