//! The key-based JSON view of a parsed tree.
//!
//! Nodes become JSON objects: attributes live under the attribute key (`$`),
//! character data under the character key (`_`), ordered or grouped children
//! under the child key (`$$`) and namespace metadata under the attribute key
//! plus `ns` (`$ns`). Entries of an ordered children array carry their tag
//! name under `#name`, and so does the document root when ordered children
//! are collected. Named-child slots map to object members of the same name.
//!
//! Rendering recurses once per nesting level, so the depth of a tree it can
//! render is bounded by the thread's stack.

use serde_json::{Map, Number, Value as Json};

use crate::constants::NAME_KEY;
use crate::node::{Namespace, Node, NodeFlags};
use crate::options::ParseOptions;
use crate::value::Value;

/// Renders values as JSON using a fixed set of keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonView {
    attr_key: String,
    char_key: String,
    child_key: String,
    xmlns_key: String,
    root_name: bool,
}

impl Default for JsonView {
    fn default() -> Self {
        JsonView::new(&ParseOptions::default())
    }
}

impl JsonView {
    /// Creates a view using the keys configured in `options`.
    pub fn new(options: &ParseOptions) -> Self {
        JsonView {
            attr_key: options.attr_key.clone(),
            char_key: options.char_key.clone(),
            child_key: options.child_key.clone(),
            xmlns_key: options.xmlns_key(),
            root_name: options.ordered_children(),
        }
    }

    /// Converts a parse result to JSON.
    ///
    /// `value` is treated as a document root: a logical-root wrapper renders
    /// its single field, and in ordered-children mode the root element keeps
    /// its `#name`.
    pub fn render(&self, value: &Value) -> Json {
        match value {
            Value::Node(node) if node.is_logical_root() => {
                let mut obj = Map::new();
                for (key, value) in node.fields().iter() {
                    obj.insert(key.to_string(), self.render_root(value));
                }
                Json::Object(obj)
            }
            other => self.render_root(other),
        }
    }

    fn render_root(&self, value: &Value) -> Json {
        match value {
            Value::Node(node) => Json::Object(self.node_object(node, self.root_name)),
            other => self.render_value(other),
        }
    }

    fn render_value(&self, value: &Value) -> Json {
        match value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => {
                Json::Array(items.iter().map(|v| self.render_value(v)).collect())
            }
            Value::Node(node) => Json::Object(self.node_object(node, false)),
        }
    }

    fn node_object(&self, node: &Node, with_name: bool) -> Map<String, Json> {
        let mut obj = Map::new();
        if node.is_logical_root() {
            for (key, value) in node.fields().iter() {
                obj.insert(key.to_string(), self.render_value(value));
            }
            return obj;
        }

        if with_name {
            obj.insert(NAME_KEY.to_string(), Json::String(node.name().to_string()));
        }

        if let Some(attrs) = node.attributes() {
            let mut out = Map::new();
            for (key, value) in attrs.iter() {
                let rendered = match node.attribute_namespaces().and_then(|ns| ns.get(key)) {
                    Some(ns) => self.namespaced_attribute(key, value, ns),
                    None => self.render_value(value),
                };
                out.insert(key.to_string(), rendered);
            }
            obj.insert(self.attr_key.clone(), Json::Object(out));
        }

        if let Some(ns) = node.namespace() {
            let mut out = Map::new();
            out.insert("uri".to_string(), Json::String(ns.uri.clone()));
            out.insert("local".to_string(), Json::String(ns.local.clone()));
            obj.insert(self.xmlns_key.clone(), Json::Object(out));
        }

        let grouped = node.flags().contains(NodeFlags::GROUPED_CHILDREN);
        let chars_grouped = grouped && node.flags().contains(NodeFlags::GROUPED_CHARS);

        if let Some(text) = node.text() {
            if !chars_grouped {
                obj.insert(self.char_key.clone(), self.render_value(text));
            }
        }

        if let Some(children) = node.children() {
            let ordered = children
                .iter()
                .map(|child| Json::Object(self.child_object(child)))
                .collect();
            obj.insert(self.child_key.clone(), Json::Array(ordered));
        }

        if grouped {
            let mut group = Map::new();
            if chars_grouped {
                if let Some(text) = node.text() {
                    group.insert(self.char_key.clone(), self.render_value(text));
                }
            }
            for (key, value) in node.fields().iter() {
                group.insert(key.to_string(), self.render_value(value));
            }
            if !group.is_empty() {
                obj.insert(self.child_key.clone(), Json::Object(group));
            }
        } else {
            for (key, value) in node.fields().iter() {
                obj.insert(key.to_string(), self.render_value(value));
            }
        }
        obj
    }

    fn child_object(&self, child: &Node) -> Map<String, Json> {
        if child.is_text() || child.is_comment() {
            let mut obj = Map::new();
            obj.insert(NAME_KEY.to_string(), Json::String(child.name().to_string()));
            if let Some(text) = child.text() {
                obj.insert(self.char_key.clone(), self.render_value(text));
            }
            return obj;
        }
        self.node_object(child, true)
    }

    fn namespaced_attribute(&self, name: &str, value: &Value, ns: &Namespace) -> Json {
        let mut out = Map::new();
        out.insert("name".to_string(), Json::String(name.to_string()));
        out.insert("value".to_string(), self.render_value(value));
        out.insert("prefix".to_string(), Json::String(ns.prefix.clone()));
        out.insert("local".to_string(), Json::String(ns.local.clone()));
        out.insert("uri".to_string(), Json::String(ns.uri.clone()));
        Json::Object(out)
    }
}

/// Converts a value to JSON with the keys from `options`.
pub fn to_json(value: &Value, options: &ParseOptions) -> Json {
    JsonView::new(options).render(value)
}

fn number(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Json::from(n as i64)
    } else {
        Number::from_f64(n).map(Json::Number).unwrap_or(Json::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::XmlParser;
    use serde_json::json;

    fn parse_json(options: ParseOptions, xml: &str) -> Json {
        let view = JsonView::new(&options);
        let parser = XmlParser::new(options).unwrap();
        view.render(&parser.parse_str(xml).unwrap().unwrap())
    }

    #[test]
    fn test_default_shape() {
        let out = parse_json(
            ParseOptions::default(),
            r#"<sample><chartest desc="Test for CHARs">Character data here!</chartest><listtest><item>a</item><item>b</item></listtest></sample>"#,
        );
        assert_eq!(
            out,
            json!({
                "sample": {
                    "chartest": [{"$": {"desc": "Test for CHARs"}, "_": "Character data here!"}],
                    "listtest": [{"item": ["a", "b"]}]
                }
            })
        );
    }

    #[test]
    fn test_custom_keys() {
        let options = ParseOptions {
            attr_key: "attrs".to_string(),
            char_key: "text".to_string(),
            ..ParseOptions::default().with_explicit_root(false)
        };
        let out = parse_json(options, r#"<a k="v">t</a>"#);
        assert_eq!(out, json!({"attrs": {"k": "v"}, "text": "t"}));
    }

    #[test]
    fn test_grouped_children() {
        let options = ParseOptions::default()
            .with_explicit_root(false)
            .with_explicit_children(true);
        let out = parse_json(options, r#"<a k="v">t<b>1</b></a>"#);
        assert_eq!(out, json!({"$": {"k": "v"}, "_": "t", "$$": {"b": ["1"]}}));

        let options = ParseOptions::default()
            .with_explicit_root(false)
            .with_explicit_children(true)
            .with_chars_as_children(true);
        let out = parse_json(options, r#"<a>t<b>1</b></a>"#);
        assert_eq!(out, json!({"$$": {"_": "t", "b": ["1"]}}));
    }

    #[test]
    fn test_ordered_children() {
        let options = ParseOptions::default()
            .with_explicit_root(false)
            .with_explicit_children(true)
            .with_preserve_children_order(true);
        let out = parse_json(options, "<r><one>1</one><two>2</two><one>3</one></r>");
        assert_eq!(
            out["$$"],
            json!([
                {"#name": "one", "_": "1"},
                {"#name": "two", "_": "2"},
                {"#name": "one", "_": "3"}
            ])
        );
        assert_eq!(out["one"], json!(["1", "3"]));
        assert_eq!(out["#name"], "r");
        assert!(out["$$"][0]["one"].is_null());
    }

    #[test]
    fn test_ordered_root_keeps_its_name() {
        let options = ParseOptions::default()
            .with_explicit_children(true)
            .with_preserve_children_order(true);
        let out = parse_json(options, "<r><a>1</a><empty/></r>");
        assert_eq!(out["r"]["#name"], "r");
        assert_eq!(out["r"]["a"], json!(["1"]));
        assert_eq!(out["r"]["empty"], json!([""]));
        assert!(out["r"]["$$"][0].get("#name").is_some());

        let out = parse_json(ParseOptions::default(), "<r><a>1</a></r>");
        assert_eq!(out, json!({"r": {"a": ["1"]}}));
    }

    #[test]
    fn test_numbers_and_namespaces() {
        let options = ParseOptions::default()
            .with_explicit_root(false)
            .with_explicit_array(false)
            .with_xmlns(true)
            .with_value_processor(crate::processors::ParseNumbers);
        let out = parse_json(options, r#"<r xmlns="urn:r"><n>10.00</n><f>1.5</f></r>"#);
        assert_eq!(out["n"], json!({"$ns": {"uri": "urn:r", "local": "n"}, "_": 10}));
        assert_eq!(out["f"]["_"], json!(1.5));
        assert_eq!(out["$ns"], json!({"uri": "urn:r", "local": "r"}));
    }
}
