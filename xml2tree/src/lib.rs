//! xml2tree - policy-driven XML to tree conversion
//!
//! This library turns XML documents into a generic in-memory tree and back.
//! A set of policies decides the shape of the tree: whether repeated and
//! single children are stored as arrays, where attributes go, how text is
//! trimmed and normalized, whether namespaces are recorded and whether the
//! document order of mixed content is preserved.
//!
//! # Overview
//!
//! The tokenizer driver (`xml`) reads the document with quick-xml and feeds
//! open, text, CDATA, comment and close events to the `TreeBuilder`. The
//! builder keeps an explicit stack of open elements; when an element closes,
//! its text is finalized, name and value processors are applied, the
//! optional validator gets a say, and the result is attached to its parent's
//! named-child slot.
//!
//! # Example
//!
//! ```
//! use xml2tree::{ParseOptions, Value, XmlParser};
//!
//! let parser = XmlParser::new(ParseOptions::default().with_explicit_array(false)).unwrap();
//! let tree = parser.parse_str("<a><b>1</b><b>2</b><c>3</c></a>").unwrap().unwrap();
//! let a = tree.get("a").unwrap();
//! assert_eq!(a.get("b"), Some(&Value::Array(vec![Value::from("1"), Value::from("2")])));
//! assert_eq!(a.get("c"), Some(&Value::from("3")));
//! ```

pub mod builder;
pub mod constants;
pub mod error;
pub mod json;
pub mod node;
pub mod options;
pub mod processors;
pub mod validator;
pub mod value;
pub mod xml;

// Re-export commonly used types
pub use builder::{assign_or_push, OpenTag, RawAttribute, TreeBuilder};
pub use constants::*;
pub use error::{Error, Result};
pub use json::{to_json, JsonView};
pub use node::{FieldMap, Namespace, Node, NodeFlags, Position};
pub use options::ParseOptions;
pub use processors::{
    FirstCharLowerCase, NameProcessor, Normalize, ParseBooleans, ParseNumbers, StripPrefix,
    ValueProcessor,
};
pub use validator::{ValidationError, Validator};
pub use value::Value;
pub use xml::{
    parse_file, parse_str, print_to_string, print_to_string_pretty, print_to_string_with,
    ParseTask, XmlDeclaration, XmlParser, XmlPrinter, XmlPrinterOptions,
};
