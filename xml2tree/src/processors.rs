//! Name and value processors.
//!
//! Processors are pure transformations applied while the tree is built:
//! name processors rewrite tag and attribute names, value processors rewrite
//! attribute values and element text. Chains run left to right, each
//! processor receiving the previous one's output.
//!
//! Closures implement both traits, so a chain can mix the built-ins below
//! with ad-hoc functions:
//!
//! ```
//! use std::sync::Arc;
//! use xml2tree::processors::{NameProcessor, Normalize};
//!
//! let chain: Vec<Arc<dyn NameProcessor>> = vec![
//!     Arc::new(Normalize),
//!     Arc::new(|name: &str| name.replace('-', "_")),
//! ];
//! assert_eq!(xml2tree::processors::process_name(&chain, "Foo-Bar"), "foo_bar");
//! ```

use std::sync::Arc;

use crate::node::{is_xmlns_attr, split_qname};
use crate::value::Value;

/// Rewrites a tag or attribute name.
pub trait NameProcessor: Send + Sync {
    /// Returns the rewritten name.
    fn process(&self, name: &str) -> String;
}

impl<F> NameProcessor for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn process(&self, name: &str) -> String {
        self(name)
    }
}

/// Rewrites an attribute value or element text.
///
/// `name` is the owning attribute's original name, or the element's processed
/// tag name, so a processor can special-case particular fields.
pub trait ValueProcessor: Send + Sync {
    /// Returns the rewritten value.
    fn process(&self, value: Value, name: &str) -> Value;
}

impl<F> ValueProcessor for F
where
    F: Fn(Value, &str) -> Value + Send + Sync,
{
    fn process(&self, value: Value, name: &str) -> Value {
        self(value, name)
    }
}

/// Runs a name through a processor chain.
pub fn process_name(processors: &[Arc<dyn NameProcessor>], name: &str) -> String {
    let mut name = name.to_string();
    for processor in processors {
        name = processor.process(&name);
    }
    name
}

/// Runs a value through a processor chain.
pub fn process_value(processors: &[Arc<dyn ValueProcessor>], value: Value, name: &str) -> Value {
    processors
        .iter()
        .fold(value, |value, processor| processor.process(value, name))
}

/// Lower-cases names. Prepended to the tag chain by `normalize_tags`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

impl NameProcessor for Normalize {
    fn process(&self, name: &str) -> String {
        name.to_lowercase()
    }
}

/// Lower-cases only the first character.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstCharLowerCase;

impl NameProcessor for FirstCharLowerCase {
    fn process(&self, name: &str) -> String {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Drops a namespace prefix, leaving `xmlns` declarations alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct StripPrefix;

impl NameProcessor for StripPrefix {
    fn process(&self, name: &str) -> String {
        if is_xmlns_attr(name) {
            return name.to_string();
        }
        match split_qname(name) {
            (Some(_), _) => name.rsplit(':').next().unwrap_or(name).to_string(),
            (None, local) => local.to_string(),
        }
    }
}

/// Converts numeric strings to numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseNumbers;

impl ValueProcessor for ParseNumbers {
    fn process(&self, value: Value, _name: &str) -> Value {
        match value {
            Value::String(s) => match parse_number(&s) {
                Some(n) => Value::Number(n),
                None => Value::String(s),
            },
            other => other,
        }
    }
}

/// Converts `true` / `false` (any case) to booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseBooleans;

impl ValueProcessor for ParseBooleans {
    fn process(&self, value: Value, _name: &str) -> Value {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => other,
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    // Rust accepts "inf" and "NaN" spellings; those stay strings.
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
