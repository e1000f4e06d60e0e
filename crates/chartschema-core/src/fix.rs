//! Fix-up pass over schema trees
//!
//! [`fix`] walks every reachable node once, depth first, and applies a
//! [`Rule`] to each. The first rule failure aborts the walk.
//!
//! The bundled policy is [`PermissiveObjects`]: values schemas exist to
//! catch type mistakes, not to reject keys the chart author did not list,
//! so every object node gets `additionalProperties: true`.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::node::{AdditionalProperties, SchemaNode};

/// Node-level fix-up rule
///
/// `path` is a JSON pointer fragment such as `#/properties/image`.
pub trait Rule: Send + Sync {
    fn apply(&self, node: &mut SchemaNode, path: &str) -> std::result::Result<(), String>;
}

impl<F> Rule for F
where
    F: Fn(&mut SchemaNode, &str) -> std::result::Result<(), String> + Send + Sync,
{
    fn apply(&self, node: &mut SchemaNode, path: &str) -> std::result::Result<(), String> {
        self(node, path)
    }
}

/// Open every object node
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveObjects;

impl Rule for PermissiveObjects {
    fn apply(&self, node: &mut SchemaNode, _path: &str) -> std::result::Result<(), String> {
        if node.is_object_like() {
            node.additional_properties = Some(AdditionalProperties::Allowed(true));
        }
        Ok(())
    }
}

/// Close every object node
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedObjects;

impl Rule for ClosedObjects {
    fn apply(&self, node: &mut SchemaNode, _path: &str) -> std::result::Result<(), String> {
        if node.is_object_like() {
            node.additional_properties = Some(AdditionalProperties::Allowed(false));
        }
        Ok(())
    }
}

/// Reject `pattern` and `patternProperties` keys that do not compile
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternCheck;

impl Rule for PatternCheck {
    fn apply(&self, node: &mut SchemaNode, _path: &str) -> std::result::Result<(), String> {
        let patterns = node
            .pattern
            .iter()
            .chain(node.pattern_properties.keys());
        for pattern in patterns {
            Regex::new(pattern).map_err(|e| format!("invalid pattern {pattern:?}: {e}"))?;
        }
        Ok(())
    }
}

/// Rules applied in order on each node
#[derive(Default)]
pub struct Chain {
    rules: Vec<Box<dyn Rule>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Rule for Chain {
    fn apply(&self, node: &mut SchemaNode, path: &str) -> std::result::Result<(), String> {
        for rule in &self.rules {
            rule.apply(node, path)?;
        }
        Ok(())
    }
}

/// Object policy enforced by the fix-up pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixPolicy {
    /// `additionalProperties: true` everywhere
    #[default]
    Permissive,
    /// `additionalProperties: false` everywhere
    Closed,
}

/// Build the rule chain for a policy
pub fn ruleset(policy: FixPolicy, check_patterns: bool) -> Chain {
    let mut chain = Chain::new();
    if check_patterns {
        chain = chain.with(PatternCheck);
    }
    match policy {
        FixPolicy::Permissive => chain.with(PermissiveObjects),
        FixPolicy::Closed => chain.with(ClosedObjects),
    }
}

/// Apply `rule` to every node of the tree
pub fn fix(node: &mut SchemaNode, rule: &dyn Rule) -> Result<()> {
    visit(node, rule, "#")
}

/// Apply the default permissive policy
pub fn fix_permissive(node: &mut SchemaNode) -> Result<()> {
    fix(node, &PermissiveObjects)
}

fn visit(node: &mut SchemaNode, rule: &dyn Rule, path: &str) -> Result<()> {
    rule.apply(node, path).map_err(|message| CoreError::Fix {
        path: path.to_string(),
        message,
    })?;

    for (name, child) in node.properties.iter_mut() {
        visit(child, rule, &format!("{path}/properties/{}", escape_pointer(name)))?;
    }
    for (pattern, child) in node.pattern_properties.iter_mut() {
        visit(
            child,
            rule,
            &format!("{path}/patternProperties/{}", escape_pointer(pattern)),
        )?;
    }
    if let Some(AdditionalProperties::Schema(child)) = node.additional_properties.as_mut() {
        visit(child, rule, &format!("{path}/additionalProperties"))?;
    }
    if let Some(items) = node.items.as_deref_mut() {
        visit(items, rule, &format!("{path}/items"))?;
    }

    let lists = [
        ("allOf", &mut node.all_of),
        ("anyOf", &mut node.any_of),
        ("oneOf", &mut node.one_of),
    ];
    for (keyword, list) in lists {
        for (idx, child) in list.iter_mut().enumerate() {
            visit(child, rule, &format!("{path}/{keyword}/{idx}"))?;
        }
    }

    let singles = [
        ("if", &mut node.if_schema),
        ("then", &mut node.then_schema),
        ("else", &mut node.else_schema),
        ("not", &mut node.not),
    ];
    for (keyword, slot) in singles {
        if let Some(child) = slot.as_deref_mut() {
            visit(child, rule, &format!("{path}/{keyword}"))?;
        }
    }

    Ok(())
}

/// Escape a key for use as a JSON pointer segment
fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::SchemaType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nested_tree() -> SchemaNode {
        let mut tree = SchemaNode::object()
            .with_property(
                "image",
                SchemaNode::object().with_property("tag", SchemaNode::typed(SchemaType::String)),
            )
            .with_property(
                "hosts",
                SchemaNode::array(Some(
                    SchemaNode::default().with_property("name", SchemaNode::default()),
                )),
            );
        tree.any_of = vec![SchemaNode::object()];
        tree.if_schema = Some(Box::new(SchemaNode::object()));
        tree.additional_properties = Some(AdditionalProperties::Allowed(false));
        tree
    }

    #[test]
    fn test_permissive_opens_all_objects() {
        let mut tree = nested_tree();
        fix_permissive(&mut tree).unwrap();

        assert_eq!(tree.additional_properties_flag(), Some(true));
        assert_eq!(
            tree.properties["image"].additional_properties_flag(),
            Some(true)
        );
        let item = tree.properties["hosts"].items.as_deref().unwrap();
        assert_eq!(item.additional_properties_flag(), Some(true));
        assert_eq!(tree.any_of[0].additional_properties_flag(), Some(true));
        assert_eq!(
            tree.if_schema.as_deref().unwrap().additional_properties_flag(),
            Some(true)
        );
        assert_eq!(tree.properties["hosts"].additional_properties, None);
        assert_eq!(
            tree.properties["image"].properties["tag"].additional_properties,
            None
        );
    }

    #[test]
    fn test_fix_is_idempotent() {
        let mut once = nested_tree();
        fix_permissive(&mut once).unwrap();
        let mut twice = once.clone();
        fix_permissive(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_closed_policy() {
        let mut tree = nested_tree();
        fix(&mut tree, &ruleset(FixPolicy::Closed, false)).unwrap();
        assert_eq!(
            tree.properties["image"].additional_properties_flag(),
            Some(false)
        );
    }

    #[test]
    fn test_visits_every_node_once() {
        let counter = AtomicUsize::new(0);
        let rule = |_: &mut SchemaNode, _: &str| -> std::result::Result<(), String> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let mut tree = nested_tree();
        fix(&mut tree, &rule).unwrap();
        // root, image, tag, hosts, hosts item, item name, anyOf[0], if
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_first_failure_aborts() {
        let mut tree = nested_tree();
        tree.properties["image"].properties["tag"].pattern = Some("(unclosed".into());
        tree.properties["hosts"].pattern = Some("[also-bad".into());

        let err = fix(&mut tree, &ruleset(FixPolicy::Permissive, true)).unwrap_err();
        match err {
            CoreError::Fix { path, message } => {
                assert_eq!(path, "#/properties/image/properties/tag");
                assert!(message.contains("(unclosed"));
            }
            other => panic!("Expected Fix error, got {other:?}"),
        }
    }

    #[test]
    fn test_pointer_escaping() {
        let mut tree = SchemaNode::object().with_property("a/b~c", SchemaNode::default());
        let seen = std::sync::Mutex::new(Vec::new());
        let rule = |_: &mut SchemaNode, path: &str| -> std::result::Result<(), String> {
            seen.lock().unwrap().push(path.to_string());
            Ok(())
        };
        fix(&mut tree, &rule).unwrap();
        assert_eq!(
            seen.into_inner().unwrap(),
            vec!["#".to_string(), "#/properties/a~1b~0c".to_string()]
        );
    }
}
