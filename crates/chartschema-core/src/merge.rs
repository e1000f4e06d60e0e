//! Deep merge of schema trees
//!
//! Merge rules, with `src` being the more specific side:
//! - Scalar keywords: `src` wins when it sets them
//! - `default`: `src` wins only when `set_defaults` is true
//! - `enum`, `allOf`, `anyOf`, `oneOf`: concatenated, `dest` first
//! - `required`: union, `dest` order first
//! - `properties`, `patternProperties`: merged key by key
//! - `items`, `not`, `if`, `then`, `else`: merged recursively
//!
//! After a two-sided merge the combinator lists are collapsed into `items`
//! and cleared. The collapse does not keep `oneOf`'s "exactly one" meaning;
//! the result is looser than the input, never stricter.

use indexmap::IndexMap;

use crate::node::SchemaNode;

/// Merge two optional trees
///
/// An absent side is the identity: the other side is returned unchanged.
pub fn merge(
    dest: Option<SchemaNode>,
    src: Option<SchemaNode>,
    set_defaults: bool,
) -> Option<SchemaNode> {
    match (dest, src) {
        (None, src) => src,
        (dest, None) => dest,
        (Some(mut dest), Some(src)) => {
            dest.merge_from(src, set_defaults);
            Some(dest)
        }
    }
}

fn merge_boxed(
    dest: Option<Box<SchemaNode>>,
    src: Option<Box<SchemaNode>>,
    set_defaults: bool,
) -> Option<Box<SchemaNode>> {
    match (dest, src) {
        (None, src) => src,
        (dest, None) => dest,
        (Some(mut dest), Some(src)) => {
            dest.merge_from(*src, set_defaults);
            Some(dest)
        }
    }
}

fn merge_map(
    dest: &mut IndexMap<String, SchemaNode>,
    src: IndexMap<String, SchemaNode>,
    set_defaults: bool,
) {
    for (key, child) in src {
        match dest.get_mut(&key) {
            Some(existing) => existing.merge_from(child, set_defaults),
            None => {
                dest.insert(key, child);
            }
        }
    }
}

fn overwrite<T>(dest: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dest = src;
    }
}

impl SchemaNode {
    /// Merge `src` into `self` in place
    pub fn merge_from(&mut self, src: SchemaNode, set_defaults: bool) {
        let SchemaNode {
            id,
            title,
            description,
            types,
            default,
            pattern,
            min_length,
            max_length,
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            multiple_of,
            min_items,
            max_items,
            items,
            properties,
            pattern_properties,
            additional_properties,
            required,
            all_of,
            any_of,
            one_of,
            not,
            if_schema,
            then_schema,
            else_schema,
            enum_values,
            read_only,
        } = src;

        overwrite(&mut self.id, id);
        overwrite(&mut self.title, title);
        overwrite(&mut self.description, description);
        if !types.is_empty() {
            self.types = types;
        }
        if set_defaults {
            overwrite(&mut self.default, default);
        }
        overwrite(&mut self.pattern, pattern);
        overwrite(&mut self.min_length, min_length);
        overwrite(&mut self.max_length, max_length);
        overwrite(&mut self.minimum, minimum);
        overwrite(&mut self.maximum, maximum);
        overwrite(&mut self.exclusive_minimum, exclusive_minimum);
        overwrite(&mut self.exclusive_maximum, exclusive_maximum);
        overwrite(&mut self.multiple_of, multiple_of);
        overwrite(&mut self.min_items, min_items);
        overwrite(&mut self.max_items, max_items);
        overwrite(&mut self.additional_properties, additional_properties);
        overwrite(&mut self.read_only, read_only);

        self.enum_values.extend(enum_values);
        self.all_of.extend(all_of);
        self.any_of.extend(any_of);
        self.one_of.extend(one_of);

        for name in required {
            if !self.required.contains(&name) {
                self.required.push(name);
            }
        }

        merge_map(&mut self.properties, properties, set_defaults);
        merge_map(&mut self.pattern_properties, pattern_properties, set_defaults);

        self.items = merge_boxed(self.items.take(), items, set_defaults);
        self.not = merge_boxed(self.not.take(), not, set_defaults);
        self.if_schema = merge_boxed(self.if_schema.take(), if_schema, set_defaults);
        self.then_schema = merge_boxed(self.then_schema.take(), then_schema, set_defaults);
        self.else_schema = merge_boxed(self.else_schema.take(), else_schema, set_defaults);

        self.collapse_combinators(set_defaults);
    }

    /// Fold every combinator list into `items` and clear the lists
    fn collapse_combinators(&mut self, set_defaults: bool) {
        if !self.has_combinators() {
            return;
        }

        let lists = [
            std::mem::take(&mut self.all_of),
            std::mem::take(&mut self.any_of),
            std::mem::take(&mut self.one_of),
        ];
        for variants in lists {
            let count = variants.len();
            let collapsed = variants
                .into_iter()
                .fold(None, |acc, variant| merge(acc, Some(variant), set_defaults));
            if collapsed.is_some() {
                tracing::debug!(variants = count, "collapsing combinator into items");
            }
            self.items = merge_boxed(self.items.take(), collapsed.map(Box::new), set_defaults);
        }
    }
}
