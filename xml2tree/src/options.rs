//! Parse options.
//!
//! All policy switches live in one struct that is validated once when an
//! `XmlParser` is created and then only read. The defaults give the legacy
//! tree shape: every child slot is an array, attributes sit in their own map
//! and the result is wrapped in its root tag name. Tokenization is strict.

use std::fmt;
use std::sync::Arc;

use crate::constants::{DEFAULT_ATTR_KEY, DEFAULT_CHAR_KEY, DEFAULT_CHILD_KEY, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};
use crate::processors::{process_name, NameProcessor, Normalize, ValueProcessor};
use crate::validator::Validator;
use crate::value::Value;

/// Options controlling tree construction.
#[derive(Clone)]
pub struct ParseOptions {
    /// Always store named children as arrays, even singletons.
    pub explicit_array: bool,
    /// Store attributes in the named-child slots instead of an attribute map.
    pub merge_attrs: bool,
    /// Skip attributes entirely.
    pub ignore_attrs: bool,
    /// Trim element text.
    pub trim: bool,
    /// Collapse runs of two or more whitespace characters and trim.
    pub normalize: bool,
    /// Wrap the result in a logical root keyed by the root tag name.
    pub explicit_root: bool,
    /// Never collapse text-only elements to their bare text.
    pub explicit_charkey: bool,
    /// Group children under the child key, or keep them in document order
    /// together with `preserve_children_order`.
    pub explicit_children: bool,
    /// Keep an ordered children list (requires `explicit_children`).
    pub preserve_children_order: bool,
    /// Put text fragments into the children representation.
    pub chars_as_children: bool,
    /// Keep whitespace-only text fragments as children.
    pub include_white_chars: bool,
    /// Attach namespace metadata to elements and attributes.
    pub xmlns: bool,
    /// Lower-case tag names before the tag-name processors run.
    pub normalize_tags: bool,
    /// Value stored for elements with no content at all.
    pub empty_tag: Value,
    /// Reject malformed markup instead of recovering from it.
    pub strict: bool,
    /// Bytes of input consumed per streaming step.
    pub chunk_size: usize,
    /// Feed input in `chunk_size` steps, yielding between them.
    pub async_mode: bool,
    /// Hook called for every closed element.
    pub validator: Option<Arc<dyn Validator>>,
    /// Processors applied to tag names.
    pub tag_name_processors: Vec<Arc<dyn NameProcessor>>,
    /// Processors applied to attribute names.
    pub attr_name_processors: Vec<Arc<dyn NameProcessor>>,
    /// Processors applied to attribute values.
    pub attr_value_processors: Vec<Arc<dyn ValueProcessor>>,
    /// Processors applied to element text.
    pub value_processors: Vec<Arc<dyn ValueProcessor>>,
    /// JSON view key for attributes.
    pub attr_key: String,
    /// JSON view key for character data.
    pub char_key: String,
    /// JSON view key for explicit children.
    pub child_key: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            explicit_array: true,
            merge_attrs: false,
            ignore_attrs: false,
            trim: false,
            normalize: false,
            explicit_root: true,
            explicit_charkey: false,
            explicit_children: false,
            preserve_children_order: false,
            chars_as_children: false,
            include_white_chars: false,
            xmlns: false,
            normalize_tags: false,
            empty_tag: Value::String(String::new()),
            strict: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            async_mode: false,
            validator: None,
            tag_name_processors: Vec::new(),
            attr_name_processors: Vec::new(),
            attr_value_processors: Vec::new(),
            value_processors: Vec::new(),
            attr_key: DEFAULT_ATTR_KEY.to_string(),
            char_key: DEFAULT_CHAR_KEY.to_string(),
            child_key: DEFAULT_CHILD_KEY.to_string(),
        }
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("explicit_array", &self.explicit_array)
            .field("merge_attrs", &self.merge_attrs)
            .field("ignore_attrs", &self.ignore_attrs)
            .field("trim", &self.trim)
            .field("normalize", &self.normalize)
            .field("explicit_root", &self.explicit_root)
            .field("explicit_charkey", &self.explicit_charkey)
            .field("explicit_children", &self.explicit_children)
            .field("preserve_children_order", &self.preserve_children_order)
            .field("chars_as_children", &self.chars_as_children)
            .field("include_white_chars", &self.include_white_chars)
            .field("xmlns", &self.xmlns)
            .field("normalize_tags", &self.normalize_tags)
            .field("empty_tag", &self.empty_tag)
            .field("strict", &self.strict)
            .field("chunk_size", &self.chunk_size)
            .field("async_mode", &self.async_mode)
            .field("validator", &self.validator.is_some())
            .field("tag_name_processors", &self.tag_name_processors.len())
            .field("attr_name_processors", &self.attr_name_processors.len())
            .field("attr_value_processors", &self.attr_value_processors.len())
            .field("value_processors", &self.value_processors.len())
            .field("attr_key", &self.attr_key)
            .field("char_key", &self.char_key)
            .field("child_key", &self.child_key)
            .finish()
    }
}

impl ParseOptions {
    /// Creates options with the default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `explicit_array`.
    pub fn with_explicit_array(mut self, on: bool) -> Self {
        self.explicit_array = on;
        self
    }

    /// Sets `merge_attrs`.
    pub fn with_merge_attrs(mut self, on: bool) -> Self {
        self.merge_attrs = on;
        self
    }

    /// Sets `ignore_attrs`.
    pub fn with_ignore_attrs(mut self, on: bool) -> Self {
        self.ignore_attrs = on;
        self
    }

    /// Sets `trim`.
    pub fn with_trim(mut self, on: bool) -> Self {
        self.trim = on;
        self
    }

    /// Sets `normalize`.
    pub fn with_normalize(mut self, on: bool) -> Self {
        self.normalize = on;
        self
    }

    /// Sets `explicit_root`.
    pub fn with_explicit_root(mut self, on: bool) -> Self {
        self.explicit_root = on;
        self
    }

    /// Sets `explicit_charkey`.
    pub fn with_explicit_charkey(mut self, on: bool) -> Self {
        self.explicit_charkey = on;
        self
    }

    /// Sets `explicit_children`.
    pub fn with_explicit_children(mut self, on: bool) -> Self {
        self.explicit_children = on;
        self
    }

    /// Sets `preserve_children_order`.
    pub fn with_preserve_children_order(mut self, on: bool) -> Self {
        self.preserve_children_order = on;
        self
    }

    /// Sets `chars_as_children`.
    pub fn with_chars_as_children(mut self, on: bool) -> Self {
        self.chars_as_children = on;
        self
    }

    /// Sets `include_white_chars`.
    pub fn with_include_white_chars(mut self, on: bool) -> Self {
        self.include_white_chars = on;
        self
    }

    /// Sets `xmlns`.
    pub fn with_xmlns(mut self, on: bool) -> Self {
        self.xmlns = on;
        self
    }

    /// Sets `normalize_tags`.
    pub fn with_normalize_tags(mut self, on: bool) -> Self {
        self.normalize_tags = on;
        self
    }

    /// Sets the value stored for empty elements.
    pub fn with_empty_tag(mut self, value: Value) -> Self {
        self.empty_tag = value;
        self
    }

    /// Sets `strict`.
    pub fn with_strict(mut self, on: bool) -> Self {
        self.strict = on;
        self
    }

    /// Enables streaming with the given chunk size.
    pub fn with_chunked(mut self, chunk_size: usize) -> Self {
        self.async_mode = true;
        self.chunk_size = chunk_size;
        self
    }

    /// Installs a validator.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Appends a tag-name processor.
    pub fn with_tag_name_processor(mut self, p: impl NameProcessor + 'static) -> Self {
        self.tag_name_processors.push(Arc::new(p));
        self
    }

    /// Appends an attribute-name processor.
    pub fn with_attr_name_processor(mut self, p: impl NameProcessor + 'static) -> Self {
        self.attr_name_processors.push(Arc::new(p));
        self
    }

    /// Appends an attribute-value processor.
    pub fn with_attr_value_processor(mut self, p: impl ValueProcessor + 'static) -> Self {
        self.attr_value_processors.push(Arc::new(p));
        self
    }

    /// Appends an element-text processor.
    pub fn with_value_processor(mut self, p: impl ValueProcessor + 'static) -> Self {
        self.value_processors.push(Arc::new(p));
        self
    }

    /// Checks option consistency.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must be greater than zero".into()));
        }
        for (what, key) in [
            ("attr_key", &self.attr_key),
            ("char_key", &self.char_key),
            ("child_key", &self.child_key),
        ] {
            if key.is_empty() {
                return Err(Error::Config(format!("{} must not be empty", what)));
            }
        }
        if self.preserve_children_order && !self.explicit_children {
            log::warn!("preserve_children_order has no effect without explicit_children");
        }
        if self.chars_as_children && !self.explicit_children {
            log::warn!("chars_as_children has no effect without explicit_children");
        }
        Ok(())
    }

    /// Runs a raw tag name through the tag-name chain.
    pub(crate) fn tag_name(&self, raw: &str) -> String {
        if self.normalize_tags {
            process_name(&self.tag_name_processors, &Normalize.process(raw))
        } else {
            process_name(&self.tag_name_processors, raw)
        }
    }

    /// True when ordered children are collected.
    pub(crate) fn ordered_children(&self) -> bool {
        self.explicit_children && self.preserve_children_order
    }

    /// The namespace key of the JSON view: the attribute key plus `ns`.
    pub fn xmlns_key(&self) -> String {
        format!("{}ns", self.attr_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::default();
        assert!(opts.explicit_array);
        assert!(opts.explicit_root);
        assert!(opts.strict);
        assert!(!opts.merge_attrs);
        assert_eq!(opts.empty_tag, Value::from(""));
        assert_eq!(opts.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(opts.xmlns_key(), "$ns");
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        let opts = ParseOptions::default().with_chunked(0);
        assert!(matches!(opts.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let opts = ParseOptions {
            char_key: String::new(),
            ..Default::default()
        };
        assert!(matches!(opts.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_normalize_tags_runs_first() {
        let opts = ParseOptions::default()
            .with_normalize_tags(true)
            .with_tag_name_processor(|name: &str| format!("{}_x", name));
        assert_eq!(opts.tag_name("TagCase"), "tagcase_x");
    }
}
