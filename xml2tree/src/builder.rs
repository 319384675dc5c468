//! Tag-stack tree builder.
//!
//! The builder consumes structural events (open, text, cdata, comment,
//! close) in document order and turns them into a policy-shaped tree. It
//! knows nothing about XML syntax; the tokenizer driver in `xml::parser`
//! feeds it, and tests can feed it directly.
//!
//! Each open element lives in a frame on an explicit stack. Character data is
//! buffered raw in the frame and only finalized when the element closes,
//! because trimming, normalization and value processors operate on the
//! complete text. On close the finished value is attached to the parent's
//! named-child slot, and in order-preserving mode also appended to the
//! parent's ordered children.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::{FieldMap, Namespace, Node, NodeFlags, Position};
use crate::options::ParseOptions;
use crate::processors::{process_name, process_value};
use crate::validator;
use crate::value::Value;

/// A raw attribute as reported by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttribute {
    /// Attribute name as written.
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
    /// Resolved namespace, when tracked and bound.
    pub namespace: Option<Namespace>,
}

impl RawAttribute {
    /// Creates an attribute without namespace information.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            namespace: None,
        }
    }
}

/// An open-tag event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenTag {
    /// Tag name as written.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<RawAttribute>,
    /// Resolved namespace, when tracked and bound.
    pub namespace: Option<Namespace>,
    /// Where the tag starts.
    pub position: Position,
}

impl OpenTag {
    /// Creates an open-tag event with no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(RawAttribute::new(name, value));
        self
    }
}

/// An element under construction.
#[derive(Debug)]
struct Frame {
    node: Node,
    /// Name as written, used to match close tags in lenient mode.
    raw_name: String,
    chars: String,
}

/// Builds one tree from a sequence of events.
pub struct TreeBuilder<'o> {
    options: &'o ParseOptions,
    stack: Vec<Frame>,
    result: Option<Value>,
    roots_closed: usize,
}

impl<'o> TreeBuilder<'o> {
    /// Creates a builder reading the given options.
    pub fn new(options: &'o ParseOptions) -> Self {
        TreeBuilder {
            options,
            stack: Vec::new(),
            result: None,
            roots_closed: 0,
        }
    }

    /// Discards all state so the builder can be reused.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.result = None;
        self.roots_closed = 0;
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// True once the outermost element has closed.
    pub fn is_complete(&self) -> bool {
        self.roots_closed > 0 && self.stack.is_empty()
    }

    /// Handles an open tag.
    pub fn open_tag(&mut self, tag: OpenTag) {
        let opts = self.options;
        let mut node = Node::new(opts.tag_name(&tag.name));
        node.set_position(tag.position);

        if !opts.ignore_attrs {
            for attr in tag.attributes {
                // Value processors see the original name; renaming comes after.
                let value = process_value(
                    &opts.attr_value_processors,
                    Value::String(attr.value),
                    &attr.name,
                );
                let key = process_name(&opts.attr_name_processors, &attr.name);
                if opts.merge_attrs {
                    assign_or_push(node.fields_mut(), key, value, opts.explicit_array);
                } else {
                    if let Some(ns) = attr.namespace {
                        node.set_attribute_namespace(key.clone(), ns);
                    }
                    node.set_attribute(key, value);
                }
            }
        }

        if opts.xmlns {
            if let Some(ns) = tag.namespace {
                node.set_namespace(ns);
            }
        }

        self.stack.push(Frame {
            node,
            raw_name: tag.name,
            chars: String::new(),
        });
    }

    /// Handles character data. Text outside any element is ignored.
    pub fn text(&mut self, text: &str) {
        let opts = self.options;
        let Some(frame) = self.stack.last_mut() else {
            return;
        };
        frame.chars.push_str(text);

        if opts.ordered_children()
            && opts.chars_as_children
            && (opts.include_white_chars || !is_whitespace(text))
        {
            let fragment = if opts.normalize {
                collapse_whitespace(text)
            } else {
                text.to_string()
            };
            frame.node.push_child(Arc::new(Node::text_fragment(fragment)));
        }
    }

    /// Handles a CDATA section.
    pub fn cdata(&mut self, text: &str) {
        self.text(text);
        if let Some(frame) = self.stack.last_mut() {
            frame.node.insert_flags(NodeFlags::CDATA);
        }
    }

    /// Handles a comment. Only the ordered children representation keeps
    /// comments.
    pub fn comment(&mut self, text: &str) {
        if !self.options.ordered_children() {
            return;
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.node.push_child(Arc::new(Node::comment(text)));
        }
    }

    /// Closes the innermost open element.
    pub fn close_tag(&mut self) -> Result<()> {
        let frame = self.stack.pop().ok_or(Error::UnmatchedClose)?;
        let name = frame.node.name().to_string();
        let value = self.finalize(frame, &name)?;
        self.attach(name, value);
        Ok(())
    }

    /// Closes elements up to and including the innermost one written as
    /// `raw_name`. Returns false, closing nothing, if no such element is open.
    ///
    /// Used in lenient mode, where end tags may skip unclosed elements.
    pub fn close_named(&mut self, raw_name: &str) -> Result<bool> {
        let Some(idx) = self.stack.iter().rposition(|f| f.raw_name == raw_name) else {
            log::debug!("ignoring unmatched end tag </{}>", raw_name);
            return Ok(false);
        };
        while self.stack.len() > idx {
            if let Some(frame) = self.stack.last() {
                if self.stack.len() - 1 > idx {
                    log::debug!("implicitly closing <{}>", frame.raw_name);
                }
            }
            self.close_tag()?;
        }
        Ok(true)
    }

    /// Closes every open element. Used at end of input in lenient mode.
    pub fn close_all(&mut self) -> Result<()> {
        while !self.stack.is_empty() {
            self.close_tag()?;
        }
        Ok(())
    }

    /// Returns the raw name of the innermost open element.
    pub fn current_name(&self) -> Option<&str> {
        self.stack.last().map(|f| f.raw_name.as_str())
    }

    /// Consumes the builder, returning the parse result.
    pub fn finish(self) -> Option<Value> {
        self.result
    }

    /// Takes the parse result, leaving the builder empty.
    pub fn take_result(&mut self) -> Option<Value> {
        self.result.take()
    }

    /// Applies text policies, shape collapsing, the validator and children
    /// folding to a closed element.
    fn finalize(&mut self, frame: Frame, name: &str) -> Result<Value> {
        let opts = self.options;
        let Frame {
            mut node, chars, ..
        } = frame;

        if !is_whitespace(&chars) || node.is_cdata() {
            let mut text = chars;
            if opts.trim {
                text = text.trim().to_string();
            }
            if opts.normalize {
                text = collapse_whitespace(&text);
            }
            node.set_text(process_value(
                &opts.value_processors,
                Value::String(text),
                name,
            ));
        }

        // The ordered-children representation needs the full node, so no
        // collapsing happens before it has been handed to the parent.
        let mut value = if opts.ordered_children() {
            Value::node(node)
        } else if node.is_blank() {
            opts.empty_tag.clone()
        } else {
            collapse_text_only(node, opts.explicit_charkey)
        };

        if let Some(validator) = &opts.validator {
            let path = validator::xpath(self.stack.iter().map(|f| f.node.name()), name);
            let current = self.stack.last().and_then(|parent| parent.node.get(name));
            value = validator.validate(&path, current, value)?;
        }

        if opts.explicit_children && !opts.merge_attrs {
            value = self.fold_children(value);
        }

        Ok(value)
    }

    fn fold_children(&mut self, value: Value) -> Value {
        let opts = self.options;
        let Value::Node(mut node) = value else {
            return value;
        };

        if !opts.preserve_children_order {
            let mut flags = NodeFlags::GROUPED_CHILDREN;
            if opts.chars_as_children {
                flags |= NodeFlags::GROUPED_CHARS;
            }
            Arc::make_mut(&mut node).insert_flags(flags);
            return Value::Node(node);
        }

        let Some(parent) = self.stack.last_mut() else {
            return Value::Node(node);
        };
        parent.node.push_child(Arc::clone(&node));

        // Now that the ordered list holds the full node, the named slot gets
        // the legacy shape.
        if node.is_blank() {
            opts.empty_tag.clone()
        } else {
            let node = Arc::try_unwrap(node).unwrap_or_else(|shared| (*shared).clone());
            collapse_text_only(node, opts.explicit_charkey)
        }
    }

    fn attach(&mut self, name: String, value: Value) {
        let opts = self.options;
        if let Some(parent) = self.stack.last_mut() {
            assign_or_push(parent.node.fields_mut(), name, value, opts.explicit_array);
            return;
        }

        self.roots_closed += 1;
        if self.result.is_some() {
            log::debug!("discarding additional top-level element <{}>", name);
            return;
        }
        self.result = Some(if opts.explicit_root {
            Value::node(Node::logical_root(name, value))
        } else {
            value
        });
    }
}

/// Stores `value` under `key`, turning repeated keys into arrays.
///
/// An absent key receives the bare value, or a one-element array when
/// `explicit_array` is set. A present scalar is wrapped into an array before
/// appending; a present array is appended to.
pub fn assign_or_push(
    target: &mut FieldMap<Value>,
    key: impl Into<String>,
    value: Value,
    explicit_array: bool,
) {
    let key = key.into();
    match target.get_mut(&key) {
        None => {
            let value = if explicit_array {
                Value::Array(vec![value])
            } else {
                value
            };
            target.insert(key, value);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let old = std::mem::take(existing);
            *existing = Value::Array(vec![old, value]);
        }
    }
}

/// Collapses a node that has nothing but text to that text.
fn collapse_text_only(mut node: Node, explicit_charkey: bool) -> Value {
    if !explicit_charkey && node.has_only_text() {
        if let Some(text) = node.take_text() {
            return text;
        }
    }
    Value::node(node)
}

fn is_whitespace(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

/// Replaces runs of two or more whitespace characters with one space, then
/// trims. A single whitespace character between words is kept as is.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut run = String::new();
    for c in s.chars() {
        if c.is_whitespace() {
            run.push(c);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(c);
    }
    flush_run(&mut out, &mut run);
    out.trim().to_string()
}

fn flush_run(out: &mut String, run: &mut String) {
    if run.chars().count() >= 2 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}
