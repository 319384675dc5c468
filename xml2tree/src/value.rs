//! Dynamic values stored in named-child slots.
//!
//! Character data starts out as a string, but value processors and the
//! validator hook may turn it into a number, a boolean, an array or a whole
//! replacement node. `Value` is the closed set of shapes a slot can hold.

use std::fmt;
use std::sync::Arc;

use crate::node::Node;

/// A value in the parsed tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value. Used as an `empty_tag` substitute or returned by validators.
    #[default]
    Null,
    /// Boolean, typically produced by `ParseBooleans`.
    Bool(bool),
    /// Number, typically produced by `ParseNumbers` or a validator.
    Number(f64),
    /// Character data.
    String(String),
    /// Repeated children or an explicit array.
    Array(Vec<Value>),
    /// A finalized element.
    Node(Arc<Node>),
}

impl Value {
    /// Wraps a node.
    pub fn node(node: Node) -> Self {
        Value::Node(Arc::new(node))
    }

    /// Returns true for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for `Value::Array`.
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns the string if this is a `Value::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a `Value::Number`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a `Value::Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the items if this is a `Value::Array`.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the node if this is a `Value::Node`.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns a mutable node, cloning it first if the node is shared.
    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Value::Node(node) => Some(Arc::make_mut(node)),
            _ => None,
        }
    }

    /// Indexes into an array. Non-arrays behave as a one-element array, which
    /// lets callers read slots the same way regardless of `explicit_array`.
    pub fn index(&self, i: usize) -> Option<&Value> {
        match self {
            Value::Array(items) => items.get(i),
            other if i == 0 => Some(other),
            _ => None,
        }
    }

    /// Looks up a named-child slot on a node value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_node().and_then(|node| node.get(key))
    }

    /// Returns the text of a scalar, or of a node's character data.
    ///
    /// This is the accessor that hides the text-only collapse: a slot holding
    /// `"x"` and one holding a node whose text is `"x"` both return `"x"`.
    pub fn text(&self) -> Option<String> {
        match self {
            Value::Node(node) => node.text().and_then(Value::scalar_string),
            other => other.scalar_string(),
        }
    }

    /// Renders scalars as text; arrays and nodes yield `None`.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Value::Null | Value::Array(_) | Value::Node(_) => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(format_number(*n)),
            Value::String(s) => Some(s.clone()),
        }
    }
}

/// Formats a number without a trailing `.0` for integral values.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Value::Node(node) => write!(f, "<{}>", node.name()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::node(node)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_treats_scalars_as_singletons() {
        let scalar = Value::from("a");
        assert_eq!(scalar.index(0), Some(&scalar));
        assert_eq!(scalar.index(1), None);

        let array = Value::from(vec![Value::from("a"), Value::from("b")]);
        assert_eq!(array.index(1).and_then(Value::as_str), Some("b"));
    }

    #[test]
    fn test_text_reads_through_nodes() {
        let mut node = Node::new("item");
        node.set_text(Value::from("hello"));
        assert_eq!(Value::node(node).text().as_deref(), Some("hello"));
        assert_eq!(Value::from(12.0).text().as_deref(), Some("12"));
        assert_eq!(Value::Null.text(), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(15.56), "15.56");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_as_node_mut_copies_shared_nodes() {
        let original = Value::node(Node::new("a"));
        let mut copy = original.clone();
        copy.as_node_mut().unwrap().set_text(Value::from("changed"));
        assert!(original.as_node().unwrap().text().is_none());
        assert_eq!(copy.text().as_deref(), Some("changed"));
    }
}
