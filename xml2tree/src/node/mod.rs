//! Node structures for the parsed tree.
//!
//! A `Node` has two faces. The structural face holds the element's name,
//! finalized text, attributes, ordered children, namespace and source
//! position. The named-child face (`fields`) maps child tag names to the
//! accumulated child values, which is how callers usually walk the tree.
//! Both faces are filled from the same finalized child node, so they cannot
//! drift apart.

mod fields;
mod namespace;

pub use fields::FieldMap;
pub use namespace::{is_xmlns_attr, split_qname, Namespace};

use bitflags::bitflags;
use std::sync::Arc;

use crate::constants::{COMMENT_NODE_NAME, TEXT_NODE_NAME};
use crate::value::Value;

bitflags! {
    /// Flags describing how a node was built and how it should be viewed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u8 {
        /// Character data came (at least partly) from a CDATA section.
        const CDATA = 1;
        /// Synthetic text fragment in an ordered children list.
        const TEXT = 1 << 1;
        /// Comment in an ordered children list.
        const COMMENT = 1 << 2;
        /// Wrapper produced by `explicit_root`; its only field is the root.
        const LOGICAL_ROOT = 1 << 3;
        /// Named children are viewed under the child key (`explicit_children`).
        const GROUPED_CHILDREN = 1 << 4;
        /// Text is viewed under the child key as well (`chars_as_children`).
        const GROUPED_CHARS = 1 << 5;
    }
}

/// Source location of the `<` that opened an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Byte offset into the input.
    pub offset: usize,
}

/// One element of the parsed tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    name: String,
    text: Option<Value>,
    attributes: Option<FieldMap<Value>>,
    attribute_namespaces: Option<FieldMap<Namespace>>,
    children: Option<Vec<Arc<Node>>>,
    namespace: Option<Namespace>,
    fields: FieldMap<Value>,
    flags: NodeFlags,
    position: Position,
}

impl Node {
    /// Creates an empty element node.
    pub fn new(name: impl Into<String>) -> Self {
        let mut node = Node::default();
        node.name = name.into();
        node
    }

    /// Creates a synthetic text fragment node.
    pub fn text_fragment(text: impl Into<String>) -> Self {
        let mut node = Node::new(TEXT_NODE_NAME);
        node.text = Some(Value::String(text.into()));
        node.flags = NodeFlags::TEXT;
        node
    }

    /// Creates a comment node.
    pub fn comment(text: impl Into<String>) -> Self {
        let mut node = Node::new(COMMENT_NODE_NAME);
        node.text = Some(Value::String(text.into()));
        node.flags = NodeFlags::COMMENT;
        node
    }

    /// Creates the logical-root wrapper holding `value` under `name`.
    ///
    /// The wrapper's own name is empty, which no real element can have.
    pub fn logical_root(name: impl Into<String>, value: Value) -> Self {
        let mut node = Node::default();
        node.fields.insert(name, value);
        node.flags = NodeFlags::LOGICAL_ROOT;
        node
    }

    /// Returns the tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the finalized character data, if any.
    pub fn text(&self) -> Option<&Value> {
        self.text.as_ref()
    }

    /// Sets the character data.
    pub fn set_text(&mut self, text: Value) {
        self.text = Some(text);
    }

    pub(crate) fn take_text(&mut self) -> Option<Value> {
        self.text.take()
    }

    /// Returns the attribute map, if the element kept one.
    pub fn attributes(&self) -> Option<&FieldMap<Value>> {
        self.attributes.as_ref()
    }

    /// Looks up a single attribute.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.as_ref().and_then(|attrs| attrs.get(key))
    }

    /// Sets an attribute, creating the attribute map on first use.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: Value) {
        self.attributes
            .get_or_insert_with(FieldMap::new)
            .insert(key, value);
    }

    /// Returns namespace metadata of attributes whose prefix resolved.
    pub fn attribute_namespaces(&self) -> Option<&FieldMap<Namespace>> {
        self.attribute_namespaces.as_ref()
    }

    pub(crate) fn set_attribute_namespace(&mut self, key: impl Into<String>, ns: Namespace) {
        self.attribute_namespaces
            .get_or_insert_with(FieldMap::new)
            .insert(key, ns);
    }

    /// Returns the ordered children, if this node collected any.
    pub fn children(&self) -> Option<&[Arc<Node>]> {
        self.children.as_deref()
    }

    /// Appends to the ordered children list.
    pub fn push_child(&mut self, child: Arc<Node>) {
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    /// Returns the element's namespace metadata.
    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespace.as_ref()
    }

    /// Sets the element's namespace metadata.
    pub fn set_namespace(&mut self, ns: Namespace) {
        self.namespace = Some(ns);
    }

    /// Returns the named-child slots.
    pub fn fields(&self) -> &FieldMap<Value> {
        &self.fields
    }

    /// Returns the named-child slots for mutation.
    pub fn fields_mut(&mut self) -> &mut FieldMap<Value> {
        &mut self.fields
    }

    /// Looks up a named-child slot.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Builder-style slot insertion, handy in validators.
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key, value);
        self
    }

    /// Returns the node flags.
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub(crate) fn insert_flags(&mut self, flags: NodeFlags) {
        self.flags.insert(flags);
    }

    /// Returns true if character data came from a CDATA section.
    pub fn is_cdata(&self) -> bool {
        self.flags.contains(NodeFlags::CDATA)
    }

    /// Returns true for synthetic text fragments.
    pub fn is_text(&self) -> bool {
        self.flags.contains(NodeFlags::TEXT)
    }

    /// Returns true for comment nodes.
    pub fn is_comment(&self) -> bool {
        self.flags.contains(NodeFlags::COMMENT)
    }

    /// Returns true for the `explicit_root` wrapper.
    pub fn is_logical_root(&self) -> bool {
        self.flags.contains(NodeFlags::LOGICAL_ROOT)
    }

    /// Returns where the element was opened.
    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Returns true if the node carries nothing besides (optional) text.
    pub(crate) fn has_only_text(&self) -> bool {
        self.attributes.is_none()
            && self.children.is_none()
            && self.namespace.is_none()
            && self.fields.is_empty()
    }

    /// Returns true if the node carries nothing at all.
    pub(crate) fn is_blank(&self) -> bool {
        self.text.is_none() && self.has_only_text()
    }

    /// Moves every subtree this node exclusively owns into `out`.
    ///
    /// Subtrees still shared with another handle only lose a reference.
    fn detach_subtrees(&mut self, out: &mut Vec<Node>) {
        let mut values = Vec::new();
        self.fields.drain_values_into(&mut values);
        if let Some(mut attrs) = self.attributes.take() {
            attrs.drain_values_into(&mut values);
        }
        values.extend(self.text.take());
        if let Some(children) = self.children.take() {
            out.extend(children.into_iter().filter_map(|child| Arc::try_unwrap(child).ok()));
        }

        while let Some(value) = values.pop() {
            match value {
                Value::Array(items) => values.extend(items),
                Value::Node(node) => {
                    if let Ok(node) = Arc::try_unwrap(node) {
                        out.push(node);
                    }
                }
                _ => {}
            }
        }
    }
}

// Trees can be as deep as the input nests, so they are torn down with an
// explicit worklist instead of the recursive drop glue.
impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_subtrees(&mut pending);
        while let Some(mut node) = pending.pop() {
            node.detach_subtrees(&mut pending);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_root_has_single_field() {
        let root = Node::logical_root("doc", Value::from("x"));
        assert!(root.is_logical_root());
        assert_eq!(root.name(), "");
        assert_eq!(root.get("doc").and_then(Value::as_str), Some("x"));
        assert_eq!(root.fields().len(), 1);
    }

    #[test]
    fn test_synthetic_nodes() {
        let text = Node::text_fragment("hi");
        assert!(text.is_text());
        assert_eq!(text.name(), TEXT_NODE_NAME);

        let comment = Node::comment(" note ");
        assert!(comment.is_comment());
        assert_eq!(comment.text().and_then(Value::as_str), Some(" note "));
    }

    #[test]
    fn test_blank_and_text_only() {
        let mut node = Node::new("a");
        assert!(node.is_blank());
        node.set_text(Value::from("t"));
        assert!(!node.is_blank());
        assert!(node.has_only_text());
        node.set_attribute("id", Value::from("1"));
        assert!(!node.has_only_text());
    }

    #[test]
    fn test_dropping_a_deep_tree() {
        let mut value = Value::from("leaf");
        for _ in 0..200_000 {
            value = Value::Array(vec![Value::node(Node::new("a").with_field("a", value))]);
        }
        drop(value);
    }

    #[test]
    fn test_dropping_keeps_shared_subtrees() {
        let shared = Arc::new(Node::new("b").with_field("c", Value::from("x")));
        let mut parent = Node::new("a");
        parent.push_child(Arc::clone(&shared));
        parent.fields_mut().insert("b", Value::Node(Arc::clone(&shared)));
        drop(parent);
        assert_eq!(Arc::strong_count(&shared), 1);
        assert_eq!(shared.get("c").and_then(Value::as_str), Some("x"));
    }
}
