//! Schema node data model
//!
//! A [`SchemaNode`] mirrors one node of a JSON Schema (draft-07) document,
//! restricted to the keywords needed to describe Helm values: object, array
//! and scalar constraints, `enum`, the `allOf`/`anyOf`/`oneOf` combinators,
//! `not`, and the `if`/`then`/`else` conditional.
//!
//! Every facet is an independent optional field, so a node may carry any
//! subset of them at once (e.g. `type: object` together with `allOf`).
//! Children are owned, which keeps every tree finite and acyclic.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Number, Value as JsonValue};

use crate::error::{CoreError, Result};

/// Meta-schema URI written at the root of serialized documents
pub const DRAFT_07: &str = "http://json-schema.org/draft-07/schema#";

/// Primitive JSON Schema type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object => write!(f, "object"),
            Self::Array => write!(f, "array"),
            Self::String => write!(f, "string"),
            Self::Number => write!(f, "number"),
            Self::Integer => write!(f, "integer"),
            Self::Boolean => write!(f, "boolean"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Union of primitive types declared by a node
///
/// Empty means unconstrained. Insertion order is kept so emission is
/// deterministic; duplicates are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeSet(Vec<SchemaType>);

impl TypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(ty: SchemaType) -> Self {
        Self(vec![ty])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, ty: SchemaType) -> bool {
        self.0.contains(&ty)
    }

    /// Add a type, returning false if it was already present
    pub fn insert(&mut self, ty: SchemaType) -> bool {
        if self.contains(ty) {
            return false;
        }
        self.0.push(ty);
        true
    }

    /// Add every type of `other` not yet present
    pub fn extend(&mut self, other: &TypeSet) {
        for ty in other.iter() {
            self.insert(ty);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = SchemaType> + '_ {
        self.0.iter().copied()
    }

    /// The single declared type, if exactly one is declared
    pub fn as_single(&self) -> Option<SchemaType> {
        match self.0.as_slice() {
            [ty] => Some(*ty),
            _ => None,
        }
    }
}

impl FromIterator<SchemaType> for TypeSet {
    fn from_iter<I: IntoIterator<Item = SchemaType>>(iter: I) -> Self {
        let mut set = TypeSet::new();
        for ty in iter {
            set.insert(ty);
        }
        set
    }
}

impl Serialize for TypeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.as_single() {
            Some(ty) => ty.serialize(serializer),
            None => self.0.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for TypeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(SchemaType),
            Many(Vec<SchemaType>),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(ty) => TypeSet::single(ty),
            Repr::Many(types) => types.into_iter().collect(),
        })
    }
}

/// `additionalProperties` keyword: a flag in the common case, or a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<SchemaNode>),
}

/// One node of a schema tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    #[serde(rename = "$id", alias = "id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "TypeSet::is_empty")]
    pub types: TypeSet,

    /// Present-but-null is kept as `Some(Null)`
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub pattern_properties: IndexMap<String, SchemaNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaNode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<SchemaNode>>,

    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_schema: Option<Box<SchemaNode>>,

    #[serde(rename = "then", default, skip_serializing_if = "Option::is_none")]
    pub then_schema: Option<Box<SchemaNode>>,

    #[serde(rename = "else", default, skip_serializing_if = "Option::is_none")]
    pub else_schema: Option<Box<SchemaNode>>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<JsonValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

fn deserialize_present<'de, D>(deserializer: D) -> std::result::Result<Option<JsonValue>, D::Error>
where
    D: Deserializer<'de>,
{
    JsonValue::deserialize(deserializer).map(Some)
}

impl SchemaNode {
    /// Node constrained to a single type
    pub fn typed(ty: SchemaType) -> Self {
        Self {
            types: TypeSet::single(ty),
            ..Self::default()
        }
    }

    /// Empty object node
    pub fn object() -> Self {
        Self::typed(SchemaType::Object)
    }

    /// Array node with an optional item schema
    pub fn array(items: Option<SchemaNode>) -> Self {
        Self {
            items: items.map(Box::new),
            ..Self::typed(SchemaType::Array)
        }
    }

    /// Scalar node carrying its example value as default
    pub fn scalar(ty: SchemaType, default: JsonValue) -> Self {
        Self {
            default: Some(default),
            ..Self::typed(ty)
        }
    }

    /// Add a property, replacing any previous one of the same name
    pub fn with_property(mut self, name: impl Into<String>, node: SchemaNode) -> Self {
        self.properties.insert(name.into(), node);
        self
    }

    /// True if the node describes an object, either by type or by structure
    pub fn is_object_like(&self) -> bool {
        self.types.contains(SchemaType::Object)
            || (self.types.is_empty() && !self.properties.is_empty())
    }

    /// True if any combinator list is populated
    pub fn has_combinators(&self) -> bool {
        !self.all_of.is_empty() || !self.any_of.is_empty() || !self.one_of.is_empty()
    }

    /// Explicit `additionalProperties` flag, if the keyword is a boolean
    pub fn additional_properties_flag(&self) -> Option<bool> {
        match &self.additional_properties {
            Some(AdditionalProperties::Allowed(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// Parse a JSON-encoded schema document
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(CoreError::json)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_json_slice(text.as_bytes())
    }

    /// Parse a YAML-encoded schema document
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(CoreError::yaml)
    }

    /// Convert to a JSON value
    pub fn to_value(&self) -> Result<JsonValue> {
        serde_json::to_value(self).map_err(CoreError::json)
    }

    /// Convert to a root document value, `$schema` first
    pub fn to_document(&self) -> Result<JsonValue> {
        let mut document = serde_json::Map::new();
        document.insert("$schema".into(), JsonValue::String(DRAFT_07.into()));
        if let JsonValue::Object(body) = self.to_value()? {
            document.extend(body);
        }
        Ok(JsonValue::Object(document))
    }

    /// Compact JSON text of the root document
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.to_document()?).map_err(CoreError::json)
    }

    /// Indented JSON text of the root document
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_document()?).map_err(CoreError::json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_set_serializes_single_as_string() {
        let node = SchemaNode::typed(SchemaType::String);
        assert_eq!(node.to_value().unwrap(), json!({"type": "string"}));
    }

    #[test]
    fn test_type_set_union_serializes_as_array() {
        let mut node = SchemaNode::typed(SchemaType::String);
        node.types.insert(SchemaType::Null);
        assert_eq!(
            node.to_value().unwrap(),
            json!({"type": ["string", "null"]})
        );
    }

    #[test]
    fn test_type_set_ignores_duplicates() {
        let set: TypeSet = [SchemaType::Integer, SchemaType::Integer].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_json_schema() {
        let text = r#"{
            "$schema": "http://json-schema.org/draft-07/schema#",
            "type": ["object"],
            "properties": {
                "replicas": { "type": "integer", "minimum": 1, "default": null },
                "mode": { "enum": ["a", "b"] }
            },
            "additionalProperties": { "type": "string" },
            "if": { "required": ["mode"] }
        }"#;

        let node = SchemaNode::from_json_str(text).unwrap();
        assert!(node.types.contains(SchemaType::Object));
        let replicas = &node.properties["replicas"];
        assert_eq!(replicas.minimum, Some(Number::from(1)));
        assert_eq!(replicas.default, Some(JsonValue::Null));
        assert_eq!(node.properties["mode"].enum_values.len(), 2);
        assert!(matches!(
            node.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
        assert!(node.if_schema.is_some());
    }

    #[test]
    fn test_absent_default_stays_none() {
        let node = SchemaNode::from_json_str(r#"{"type": "string"}"#).unwrap();
        assert_eq!(node.default, None);
    }

    #[test]
    fn test_parse_yaml_schema() {
        let yaml = r#"
type: object
additionalProperties: false
properties:
  name:
    type: string
    pattern: "^[a-z]+$"
"#;
        let node = SchemaNode::from_yaml_str(yaml).unwrap();
        assert_eq!(node.additional_properties_flag(), Some(false));
        assert_eq!(
            node.properties["name"].pattern.as_deref(),
            Some("^[a-z]+$")
        );
    }

    #[test]
    fn test_document_has_schema_first() {
        let doc = SchemaNode::object().to_document().unwrap();
        let first = doc.as_object().unwrap().keys().next().unwrap();
        assert_eq!(first, "$schema");
    }

    #[test]
    fn test_object_like_by_structure() {
        let node = SchemaNode::default().with_property("a", SchemaNode::default());
        assert!(node.is_object_like());
        assert!(!SchemaNode::typed(SchemaType::Array).is_object_like());
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = SchemaNode::from_json_str("{not json").unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
