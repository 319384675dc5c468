//! XML parser entry points.
//!
//! `XmlParser` owns a validated `ParseOptions` and starts one independent
//! `ParseTask` per document, so a parser can be reused (and shared between
//! threads) without state leaking from one parse into the next.

use std::fs;
use std::path::Path;

use super::task::ParseTask;
use crate::error::Result;
use crate::options::ParseOptions;
use crate::value::Value;

/// XML parser that builds policy-shaped trees.
#[derive(Debug, Clone, Default)]
pub struct XmlParser {
    options: ParseOptions,
}

impl XmlParser {
    /// Creates a parser, rejecting inconsistent options.
    pub fn new(options: ParseOptions) -> Result<Self> {
        options.validate()?;
        Ok(XmlParser { options })
    }

    /// Returns the parser's options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses XML from a string.
    ///
    /// Returns `Ok(None)` when the input holds no element, for example when
    /// it is empty or whitespace only.
    pub fn parse_str(&self, xml: &str) -> Result<Option<Value>> {
        log::debug!("parsing {} bytes (strict: {})", xml.len(), self.options.strict);
        self.stream(xml).run()
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Option<Value>> {
        let path = path.as_ref();
        log::debug!("reading {}", path.display());
        let xml = fs::read_to_string(path)?;
        self.parse_str(&xml)
    }

    /// Starts a resumable parse of `xml`.
    ///
    /// With `async_mode` the task yields after every `chunk_size` bytes of
    /// input; otherwise the first poll runs to completion.
    pub fn stream<'a>(&'a self, xml: &'a str) -> ParseTask<'a> {
        ParseTask::new(&self.options, xml)
    }
}

/// Parses XML from a file with default options.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Option<Value>> {
    XmlParser::default().parse_file(path)
}

/// Parses XML from a string with default options.
pub fn parse_str(xml: &str) -> Result<Option<Value>> {
    XmlParser::default().parse_str(xml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::node::NodeFlags;

    fn lenient() -> XmlParser {
        XmlParser::new(ParseOptions::default().with_strict(false)).unwrap()
    }

    #[test]
    fn test_parse_simple_xml() {
        let root = parse_str(r#"<root><child>text</child></root>"#).unwrap().unwrap();
        let wrapper = root.as_node().unwrap();
        assert!(wrapper.flags().contains(NodeFlags::LOGICAL_ROOT));
        let child = root.get("root").and_then(|r| r.get("child")).unwrap();
        assert_eq!(child, &Value::Array(vec![Value::from("text")]));
    }

    #[test]
    fn test_parse_with_attributes() {
        let root = parse_str(r#"<root id="foo" class="bar">content</root>"#)
            .unwrap()
            .unwrap();
        let node = root.get("root").and_then(Value::as_node).unwrap();
        assert_eq!(node.attribute("id"), Some(&Value::from("foo")));
        assert_eq!(node.attribute("class"), Some(&Value::from("bar")));
        assert_eq!(node.text(), Some(&Value::from("content")));
    }

    #[test]
    fn test_entities_are_resolved() {
        let root = parse_str("<t a=\"x &amp; y\">&lt;tag&gt; &#65;&#x42;</t>")
            .unwrap()
            .unwrap();
        let node = root.get("t").and_then(Value::as_node).unwrap();
        assert_eq!(node.attribute("a"), Some(&Value::from("x & y")));
        assert_eq!(node.text(), Some(&Value::from("<tag> AB")));
    }

    #[test]
    fn test_empty_and_whitespace_input() {
        assert_eq!(parse_str("").unwrap(), None);
        assert_eq!(parse_str("  \n\t ").unwrap(), None);
        assert_eq!(parse_str("<?xml version=\"1.0\"?>\n").unwrap(), None);
    }

    #[test]
    fn test_bom_is_stripped() {
        let root = parse_str("\u{feff}<a>x</a>").unwrap().unwrap();
        assert_eq!(root.get("a"), Some(&Value::from("x")));
    }

    #[test]
    fn test_mismatched_close_reports_location() {
        let err = parse_str("<a><b></a>").unwrap_err();
        match err {
            Error::Syntax { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 1);
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_root_fails_in_strict_mode() {
        let err = parse_str("<test>").unwrap_err();
        assert!(err.to_string().starts_with("Unclosed root tag"));
    }

    #[test]
    fn test_text_outside_root() {
        let err = parse_str("hello <a/>").unwrap_err();
        assert!(err.to_string().starts_with("Non-whitespace before first tag."));
        let err = parse_str("<a/> trailing").unwrap_err();
        assert!(err.to_string().starts_with("Text data outside of root node."));
    }

    #[test]
    fn test_invalid_element_name() {
        let err = parse_str("<root><1x/></root>").unwrap_err();
        match err {
            Error::Syntax {
                message, character, ..
            } => {
                assert_eq!(message, "Invalid element name");
                assert_eq!(character, Some('1'));
            }
            other => panic!("expected syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_roots() {
        assert!(parse_str("<a/><b/>").is_err());
        let first = lenient().parse_str("<a>1</a><b>2</b>").unwrap().unwrap();
        assert_eq!(first.get("a"), Some(&Value::from("1")));
        assert!(first.get("b").is_none());
    }

    #[test]
    fn test_lenient_recovers_unclosed_elements() {
        let root = lenient()
            .parse_str("<html><body><br></body></html>")
            .unwrap()
            .unwrap();
        let body = root
            .get("html")
            .and_then(|h| h.get("body"))
            .and_then(|b| b.index(0))
            .unwrap();
        assert_eq!(body.get("br"), Some(&Value::Array(vec![Value::from("")])));

        let root = lenient().parse_str("<test><a>x").unwrap().unwrap();
        assert!(root.get("test").and_then(|t| t.get("a")).is_some());
    }

    #[test]
    fn test_lenient_keeps_unknown_entities() {
        let root = lenient().parse_str("<p>a&nbsp;b</p>").unwrap().unwrap();
        assert_eq!(root.get("p"), Some(&Value::from("a&nbsp;b")));
        assert!(parse_str("<p>a&nbsp;b</p>").is_err());
    }

    #[test]
    fn test_positions_are_recorded() {
        let parser = XmlParser::new(ParseOptions::default().with_explicit_charkey(true)).unwrap();
        let root = parser.parse_str("<a>\n  <b>x</b>\n</a>").unwrap().unwrap();
        let b = root
            .get("a")
            .and_then(|a| a.get("b"))
            .and_then(|b| b.index(0))
            .and_then(Value::as_node)
            .unwrap();
        assert_eq!((b.position().line, b.position().column), (2, 3));
        assert_eq!(b.position().offset, 6);
    }

    #[test]
    fn test_namespaces() {
        let parser = XmlParser::new(ParseOptions::default().with_xmlns(true)).unwrap();
        let root = parser
            .parse_str(r#"<pfx:top xmlns:pfx="urn:x" pfx:attr="1"><plain/></pfx:top>"#)
            .unwrap()
            .unwrap();
        let top = root.get("pfx:top").and_then(Value::as_node).unwrap();
        let ns = top.namespace().unwrap();
        assert_eq!((ns.prefix.as_str(), ns.local.as_str(), ns.uri.as_str()), ("pfx", "top", "urn:x"));
        let attr_ns = top.attribute_namespaces().and_then(|m| m.get("pfx:attr")).unwrap();
        assert_eq!(attr_ns.uri, "urn:x");
        // No default namespace is bound, so the child carries none.
        assert_eq!(top.get("plain"), Some(&Value::Array(vec![Value::from("")])));
    }

    #[test]
    fn test_parser_is_reusable() {
        let parser = XmlParser::default();
        let first = parser.parse_str("<a>1</a>").unwrap();
        assert!(parser.parse_str("<a>").is_err());
        let again = parser.parse_str("<a>1</a>").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let options = ParseOptions::default().with_chunked(0);
        assert!(matches!(XmlParser::new(options), Err(Error::Config(_))));
    }
}
