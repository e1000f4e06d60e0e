//! Comment extraction from raw values text
//!
//! `serde_yaml` discards comments, so they are recovered with a line scanner
//! that tracks the block-mapping key path by indentation. Only block style
//! is understood; keys inside flow collections are not annotated.
//!
//! ```yaml
//! # Number of pods        <- head comment of `replicaCount`
//! replicaCount: 2         # Replicas   <- inline comment
//! ```
//!
//! Keys inside sequence elements are recorded under the [`ITEM_SEGMENT`]
//! path segment, so `hosts: [- name: a]` yields the path `hosts.[].name`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Path segment standing for "any element of this sequence"
pub const ITEM_SEGMENT: &str = "[]";

static SCHEMA_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*#\s*(?:schema:\s*|yaml-language-server:\s*\$schema=)(\S+)")
        .expect("schema reference pattern is valid")
});

/// Find a schema reference directive in the document's comments
///
/// Recognizes `# schema: <url>` and the editor modeline
/// `# yaml-language-server: $schema=<url>` on top-level comment lines only.
/// Block scalar content is always indented under its key, so a `#` line
/// inside a multi-line string is never taken for a directive.
pub fn find_schema_reference(text: &str) -> Option<String> {
    text.lines()
        .filter(|line| line.starts_with('#'))
        .find_map(|line| SCHEMA_REFERENCE.captures(line))
        .map(|caps| caps[1].to_string())
}

/// Comments attached to one mapping key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeComments {
    /// Comment block directly above the key
    pub head: Option<String>,
    /// Comment trailing the key on the same line
    pub inline: Option<String>,
}

/// Comments of a document, keyed by key path
#[derive(Debug, Clone, Default)]
pub struct CommentMap {
    entries: HashMap<Vec<String>, NodeComments>,
}

#[derive(Debug)]
struct Frame {
    indent: usize,
    segment: String,
}

impl CommentMap {
    /// Scan a YAML document for key comments
    pub fn parse(text: &str) -> Self {
        let mut map = Self::default();
        let mut stack: Vec<Frame> = Vec::new();
        let mut pending: Vec<String> = Vec::new();
        let mut block_scalar: Option<usize> = None;

        for line in text.lines() {
            let trimmed = line.trim_start();
            let mut indent = line.len() - trimmed.len();

            if let Some(owner) = block_scalar {
                if trimmed.is_empty() || indent > owner {
                    continue;
                }
                block_scalar = None;
            }

            if trimmed.is_empty() {
                pending.clear();
                continue;
            }
            if trimmed.starts_with('#') {
                if indent > 0 || !SCHEMA_REFERENCE.is_match(trimmed) {
                    pending.push(clean_comment(trimmed));
                }
                continue;
            }
            if trimmed.starts_with("---") || trimmed.starts_with("...") {
                stack.clear();
                pending.clear();
                continue;
            }

            let mut content = trimmed;
            loop {
                let rest = if content == "-" {
                    ""
                } else if let Some(rest) = content.strip_prefix("- ") {
                    rest
                } else {
                    break;
                };
                while stack.last().is_some_and(|top| {
                    top.indent > indent || (top.indent == indent && top.segment == ITEM_SEGMENT)
                }) {
                    stack.pop();
                }
                stack.push(Frame {
                    indent,
                    segment: ITEM_SEGMENT.to_string(),
                });
                let inner = rest.trim_start();
                indent += content.len() - inner.len();
                content = inner;
            }

            let Some((key, value)) = split_key(content) else {
                pending.clear();
                continue;
            };

            while stack.last().is_some_and(|top| top.indent >= indent) {
                stack.pop();
            }

            let (value, inline) = split_inline_comment(value);
            let head = if pending.is_empty() {
                None
            } else {
                Some(pending.join("\n"))
            };
            pending.clear();

            let mut path: Vec<String> = stack.iter().map(|f| f.segment.clone()).collect();
            path.push(key.clone());
            map.record(path, head, inline);

            let value = value.trim();
            if value.starts_with('|') || value.starts_with('>') {
                block_scalar = Some(indent);
            }

            stack.push(Frame {
                indent,
                segment: key,
            });
        }

        map
    }

    fn record(&mut self, path: Vec<String>, head: Option<String>, inline: Option<String>) {
        if head.is_none() && inline.is_none() {
            return;
        }
        let entry = self.entries.entry(path).or_default();
        if entry.head.is_none() {
            entry.head = head;
        }
        if entry.inline.is_none() {
            entry.inline = inline;
        }
    }

    /// Comments recorded for a key path
    pub fn get(&self, path: &[String]) -> Option<&NodeComments> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Strip the comment marker, one space, and a helm-docs `--` prefix
fn clean_comment(raw: &str) -> String {
    let text = raw.trim_start_matches('#');
    let text = text.strip_prefix(' ').unwrap_or(text);
    let text = text.strip_prefix("-- ").unwrap_or(text);
    text.trim_end().to_string()
}

/// Split `key: value` into the unquoted key and the raw remainder
fn split_key(content: &str) -> Option<(String, &str)> {
    let (key, after) = match content.chars().next()? {
        quote @ ('"' | '\'') => {
            let end = closing_quote(content, quote)?;
            let inner = &content[1..end];
            let key = if quote == '"' {
                inner.replace("\\\"", "\"")
            } else {
                inner.replace("''", "'")
            };
            (key, content[end + 1..].trim_start())
        }
        '{' | '[' | '&' | '*' | '!' | '|' | '>' | '%' | '@' | '`' => return None,
        _ => {
            let colon = find_mapping_colon(content)?;
            (content[..colon].trim_end().to_string(), &content[colon..])
        }
    };

    let value = after.strip_prefix(':')?;
    if !(value.is_empty() || value.starts_with(' ') || value.starts_with('\t')) {
        return None;
    }
    if key.is_empty() {
        return None;
    }
    Some((key, value))
}

fn closing_quote(content: &str, quote: char) -> Option<usize> {
    let mut chars = content.char_indices().skip(1).peekable();
    while let Some((idx, ch)) = chars.next() {
        if quote == '"' && ch == '\\' {
            chars.next();
            continue;
        }
        if ch == quote {
            if quote == '\'' && chars.peek().is_some_and(|(_, next)| *next == '\'') {
                chars.next();
                continue;
            }
            return Some(idx);
        }
    }
    None
}

/// Position of the first `:` followed by whitespace or end of line
fn find_mapping_colon(content: &str) -> Option<usize> {
    let bytes = content.as_bytes();
    for (idx, byte) in bytes.iter().enumerate() {
        match byte {
            b'#' if idx > 0 && bytes[idx - 1].is_ascii_whitespace() => return None,
            b':' if bytes.get(idx + 1).is_none_or(|next| next.is_ascii_whitespace()) => {
                return Some(idx);
            }
            _ => {}
        }
    }
    None
}

/// Split a value from its trailing ` # comment`, honoring quotes
fn split_inline_comment(value: &str) -> (&str, Option<String>) {
    let mut in_single = false;
    let mut in_double = false;
    let mut prev_space = true;
    for (idx, ch) in value.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '#' if prev_space && !in_single && !in_double => {
                let comment = clean_comment(&value[idx..]);
                let comment = (!comment.is_empty()).then_some(comment);
                return (&value[..idx], comment);
            }
            _ => {}
        }
        prev_space = ch.is_whitespace();
    }
    (value, None)
}
