//! CUE source generation
//!
//! Emits one closed definition per schema:
//!
//! ```cue
//! // Code generated by chartschema. DO NOT EDIT.
//!
//! package values
//!
//! #ChartX: {
//! 	replicaCount: *2 | int & >=1
//! 	image?: {
//! 		tag?: *"1.25" | string
//! 	}
//! 	...
//! }
//! ```
//!
//! | JSON Schema                    | CUE                               |
//! |--------------------------------|-----------------------------------|
//! | `required` / optional property | `name:` / `name?:`                |
//! | `additionalProperties: false`  | closed struct (no `...`)          |
//! | `enum`                         | disjunction of literals           |
//! | `allOf` / `anyOf`, `oneOf`     | `&` / `\|`                        |
//! | scalar `default`               | `*value \| type`                  |
//!
//! `not` and `if`/`then`/`else` have no CUE counterpart and are dropped,
//! which only loosens the result.

use std::collections::BTreeSet;
use std::fmt::Write;

use chartschema_core::{AdditionalProperties, SchemaNode, SchemaType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::error::GeneratorError;
use crate::generator::Generator;

/// Deepest schema nesting the generator accepts
pub const MAX_DEPTH: usize = 64;

const PACKAGE: &str = "values";

const KEYWORDS: &[&str] = &[
    "package", "import", "for", "in", "if", "let", "true", "false", "null",
];

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

type GenResult<T> = std::result::Result<T, GeneratorError>;

/// CUE generator
///
/// Keeps its output buffer and import set between calls, so one instance
/// must never run two generations at once.
#[derive(Debug, Default)]
pub struct CueGenerator {
    out: String,
    imports: BTreeSet<&'static str>,
    generated: u64,
}

impl CueGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful generations so far
    pub fn generated(&self) -> u64 {
        self.generated
    }

    fn expr(&mut self, node: &SchemaNode, indent: usize, depth: usize) -> GenResult<String> {
        if depth > MAX_DEPTH {
            return Err(GeneratorError::DepthExceeded { limit: MAX_DEPTH });
        }

        let mut terms = Vec::new();
        if let Some(base) = self.base(node, indent, depth)? {
            terms.push(base);
        }
        for variant in &node.all_of {
            terms.push(self.expr(variant, indent, depth + 1)?);
        }

        let mut alternatives = Vec::new();
        for variant in node.any_of.iter().chain(&node.one_of) {
            alternatives.push(self.expr(variant, indent, depth + 1)?);
        }
        if !alternatives.is_empty() {
            terms.push(alternatives.join(" | "));
        }

        if node.not.is_some()
            || node.if_schema.is_some()
            || node.then_schema.is_some()
            || node.else_schema.is_some()
        {
            tracing::debug!("dropping not/if/then/else without CUE counterpart");
        }

        let expr = match terms.len() {
            0 => "_".to_string(),
            1 => terms.remove(0),
            _ => terms.into_iter().map(group).collect::<Vec<_>>().join(" & "),
        };

        Ok(match scalar_default(node) {
            Some(default) => format!("*{default} | {expr}"),
            None => expr,
        })
    }

    fn base(&mut self, node: &SchemaNode, indent: usize, depth: usize) -> GenResult<Option<String>> {
        if !node.enum_values.is_empty() {
            let literals: Vec<String> = node.enum_values.iter().map(JsonValue::to_string).collect();
            return Ok(Some(literals.join(" | ")));
        }

        let mut types: Vec<SchemaType> = node.types.iter().collect();
        if types.is_empty() {
            if !node.properties.is_empty() || !node.pattern_properties.is_empty() {
                types.push(SchemaType::Object);
            } else if node.items.is_some() {
                types.push(SchemaType::Array);
            } else {
                return Ok(self.untyped_constraints(node));
            }
        }

        let mut arms = Vec::with_capacity(types.len());
        for ty in types {
            arms.push(self.type_term(node, ty, indent, depth)?);
        }
        Ok(Some(arms.join(" | ")))
    }

    fn type_term(
        &mut self,
        node: &SchemaNode,
        ty: SchemaType,
        indent: usize,
        depth: usize,
    ) -> GenResult<String> {
        let term = match ty {
            SchemaType::Object => self.structure(node, indent, depth)?,
            SchemaType::Array => {
                let item = match node.items.as_deref() {
                    Some(items) => group(self.expr(items, indent, depth + 1)?),
                    None => "_".to_string(),
                };
                let mut parts = vec![format!("[...{item}]")];
                parts.extend(self.list_constraints(node));
                parts.join(" & ")
            }
            SchemaType::String => {
                let mut parts = vec!["string".to_string()];
                parts.extend(self.string_constraints(node));
                parts.join(" & ")
            }
            SchemaType::Number | SchemaType::Integer => {
                let name = if ty == SchemaType::Integer { "int" } else { "number" };
                let mut parts = vec![name.to_string()];
                parts.extend(number_constraints(node));
                parts.join(" & ")
            }
            SchemaType::Boolean => "bool".to_string(),
            SchemaType::Null => "null".to_string(),
        };
        Ok(term)
    }

    /// Constraint keywords on a node without `type`
    ///
    /// Each keyword family only applies to its own kind of value, so the
    /// families become alternatives: `{"minimum": 0}` is `>=0`.
    fn untyped_constraints(&mut self, node: &SchemaNode) -> Option<String> {
        let families = [
            number_constraints(node),
            self.string_constraints(node),
            self.list_constraints(node),
        ];
        let arms: Vec<String> = families
            .into_iter()
            .filter(|parts| !parts.is_empty())
            .map(|parts| parts.join(" & "))
            .collect();
        match arms.len() {
            0 => None,
            1 => arms.into_iter().next(),
            _ => Some(
                arms.into_iter()
                    .map(|arm| if arm.contains(" & ") { format!("({arm})") } else { arm })
                    .collect::<Vec<_>>()
                    .join(" | "),
            ),
        }
    }

    fn string_constraints(&mut self, node: &SchemaNode) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(pattern) = &node.pattern {
            parts.push(format!("=~{}", quote(pattern)));
        }
        if let Some(min) = node.min_length {
            self.imports.insert("strings");
            parts.push(format!("strings.MinRunes({min})"));
        }
        if let Some(max) = node.max_length {
            self.imports.insert("strings");
            parts.push(format!("strings.MaxRunes({max})"));
        }
        parts
    }

    fn list_constraints(&mut self, node: &SchemaNode) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(min) = node.min_items {
            self.imports.insert("list");
            parts.push(format!("list.MinItems({min})"));
        }
        if let Some(max) = node.max_items {
            self.imports.insert("list");
            parts.push(format!("list.MaxItems({max})"));
        }
        parts
    }

    fn structure(&mut self, node: &SchemaNode, indent: usize, depth: usize) -> GenResult<String> {
        let inner = "\t".repeat(indent + 1);
        let mut lines = String::new();

        for (name, child) in &node.properties {
            write_comments(&mut lines, child, indent + 1);
            let marker = if node.required.contains(name) { "" } else { "?" };
            let value = self.expr(child, indent + 1, depth + 1)?;
            let _ = writeln!(lines, "{inner}{}{marker}: {value}", field_label(name));
        }
        for (pattern, child) in &node.pattern_properties {
            let value = self.expr(child, indent + 1, depth + 1)?;
            let _ = writeln!(lines, "{inner}[=~{}]: {value}", quote(pattern));
        }
        match &node.additional_properties {
            Some(AdditionalProperties::Allowed(false)) => {}
            Some(AdditionalProperties::Schema(extra)) if node.properties.is_empty() => {
                let value = self.expr(extra, indent + 1, depth + 1)?;
                let _ = writeln!(lines, "{inner}[string]: {value}");
            }
            _ => {
                let _ = writeln!(lines, "{inner}...");
            }
        }

        if lines.is_empty() {
            return Ok("{}".to_string());
        }
        Ok(format!("{{\n{lines}{}}}", "\t".repeat(indent)))
    }
}

impl Generator for CueGenerator {
    fn language(&self) -> &'static str {
        "cue"
    }

    fn generate(&mut self, schema_text: &str, target_name: &str) -> GenResult<String> {
        self.out.clear();
        self.imports.clear();

        let name = definition_name(target_name)?;
        let node = SchemaNode::from_json_str(schema_text).map_err(|e| GeneratorError::Decode {
            message: e.to_string(),
        })?;
        let body = self.expr(&node, 0, 0)?;

        let _ = writeln!(self.out, "// Code generated by chartschema. DO NOT EDIT.\n");
        let _ = writeln!(self.out, "package {PACKAGE}\n");
        match self.imports.len() {
            0 => {}
            1 => {
                let import = self.imports.iter().next().copied().unwrap_or_default();
                let _ = writeln!(self.out, "import {}\n", quote(import));
            }
            _ => {
                let _ = writeln!(self.out, "import (");
                for import in &self.imports {
                    let _ = writeln!(self.out, "\t{}", quote(import));
                }
                let _ = writeln!(self.out, ")\n");
            }
        }
        write_comments(&mut self.out, &node, 0);
        let _ = writeln!(self.out, "#{name}: {body}");

        self.generated += 1;
        Ok(std::mem::take(&mut self.out))
    }
}

/// Definition identifier for a target: `chart-x` becomes `ChartX`
pub fn definition_name(target_name: &str) -> GenResult<String> {
    let mut name = String::new();
    for segment in target_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
    {
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.push_str(chars.as_str());
        }
    }

    if name.is_empty() {
        return Err(GeneratorError::InvalidTarget {
            name: target_name.to_string(),
            reason: "no alphanumeric characters".to_string(),
        });
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Chart");
    }
    Ok(name)
}

fn write_comments(out: &mut String, node: &SchemaNode, indent: usize) {
    let tabs = "\t".repeat(indent);
    for text in [&node.title, &node.description].into_iter().flatten() {
        for line in text.lines() {
            if line.is_empty() {
                let _ = writeln!(out, "{tabs}//");
            } else {
                let _ = writeln!(out, "{tabs}// {line}");
            }
        }
    }
}

fn number_constraints(node: &SchemaNode) -> Vec<String> {
    let bounds = [
        (">=", &node.minimum),
        ("<=", &node.maximum),
        (">", &node.exclusive_minimum),
        ("<", &node.exclusive_maximum),
    ];
    bounds
        .into_iter()
        .filter_map(|(op, bound)| bound.as_ref().map(|value| format!("{op}{value}")))
        .collect()
}

fn scalar_default(node: &SchemaNode) -> Option<String> {
    node.default
        .as_ref()
        .filter(|value| !value.is_object() && !value.is_array())
        .map(JsonValue::to_string)
}

fn field_label(name: &str) -> String {
    if IDENTIFIER.is_match(name) && !KEYWORDS.contains(&name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(text: &str) -> String {
    JsonValue::String(text.to_string()).to_string()
}

/// Parenthesize an expression holding a top-level-looking disjunction
fn group(expr: String) -> String {
    if expr.contains(" | ") {
        format!("({expr})")
    } else {
        expr
    }
}
