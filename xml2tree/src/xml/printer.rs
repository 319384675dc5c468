//! XML printer that renders parsed trees back to text.
//!
//! Any `Value` can be rendered. Named-child slots become child elements
//! (arrays repeat the element), attribute maps become attributes and ordered
//! children, when present, are rendered in document order together with their
//! text fragments and comments.
//!
//! The printer recurses once per element level, so very deep trees are
//! limited by the thread's stack.

use std::io::Write;

use crate::builder::assign_or_push;
use crate::constants::DEFAULT_ROOT_NAME;
use crate::node::{FieldMap, Node};
use crate::value::Value;

/// The `<?xml ...?>` declaration written before the root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    /// XML version.
    pub version: String,
    /// Declared encoding, omitted when `None`.
    pub encoding: Option<String>,
    /// Standalone flag, omitted when `None`.
    pub standalone: Option<bool>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        XmlDeclaration {
            version: "1.0".to_string(),
            encoding: Some("UTF-8".to_string()),
            standalone: Some(true),
        }
    }
}

/// Options for XML printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPrinterOptions {
    /// Put every element on its own line, indented by depth.
    pub pretty: bool,
    /// Indentation unit used when pretty printing.
    pub indent: String,
    /// Line separator used when pretty printing.
    pub newline: String,
    /// Omit the XML declaration.
    pub headless: bool,
    /// Declaration contents.
    pub declaration: XmlDeclaration,
    /// Root element name. When unset, a tree whose only entry is a single
    /// element is rendered with that element as the root and anything else is
    /// wrapped in `<root>`.
    pub root_name: Option<String>,
    /// Wrap text containing `&`, `<` or `>` in CDATA sections instead of
    /// escaping it.
    pub cdata: bool,
}

impl Default for XmlPrinterOptions {
    fn default() -> Self {
        XmlPrinterOptions {
            pretty: true,
            indent: " ".to_string(),
            newline: "\n".to_string(),
            headless: false,
            declaration: XmlDeclaration::default(),
            root_name: None,
            cdata: false,
        }
    }
}

impl XmlPrinterOptions {
    /// Options for single-line output.
    pub fn compact() -> Self {
        XmlPrinterOptions {
            pretty: false,
            ..Default::default()
        }
    }
}

/// XML printer that outputs value trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
    options: XmlPrinterOptions,
    depth: usize,
    /// True until the first line has been written.
    at_start: bool,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer with default options.
    pub fn new(writer: W) -> Self {
        Self::with_options(writer, XmlPrinterOptions::default())
    }

    /// Creates a new XML printer with the given options.
    pub fn with_options(writer: W, options: XmlPrinterOptions) -> Self {
        XmlPrinter {
            writer,
            options,
            depth: 0,
            at_start: true,
        }
    }

    /// Prints a whole document: declaration (unless headless) and root.
    pub fn print(&mut self, value: &Value) -> std::io::Result<()> {
        if !self.options.headless {
            self.start_document()?;
        }

        let root_name = self.options.root_name.clone();
        match (root_name, value) {
            (None, Value::Node(node)) if is_wrapper(node) => {
                if let Some((name, inner)) = node.fields().iter().next() {
                    self.print_element(name, inner)?;
                }
            }
            (None, Value::Node(node)) if !node.name().is_empty() => {
                self.print_node(node.name(), node)?;
            }
            (root_name, Value::Array(items)) => {
                let name = root_name.unwrap_or_else(|| DEFAULT_ROOT_NAME.to_string());
                self.print_node(&name, &merge_items(items))?;
            }
            (root_name, other) => {
                let name = root_name.unwrap_or_else(|| DEFAULT_ROOT_NAME.to_string());
                self.print_element(&name, other)?;
            }
        }
        self.writer.flush()
    }

    /// Prints `value` as element(s) named `name`, without a declaration.
    pub fn print_element(&mut self, name: &str, value: &Value) -> std::io::Result<()> {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.print_element(name, item)?;
                }
                Ok(())
            }
            Value::Node(node) => self.print_node(name, node),
            scalar => {
                let text = scalar.scalar_string().unwrap_or_default();
                self.start_line()?;
                self.open_tag(name, None)?;
                if text.is_empty() {
                    return write!(self.writer, "/>");
                }
                write!(self.writer, ">")?;
                self.characters(&text, false)?;
                write!(self.writer, "</{}>", name)
            }
        }
    }

    fn print_node(&mut self, name: &str, node: &Node) -> std::io::Result<()> {
        let text = node
            .text()
            .and_then(Value::scalar_string)
            .filter(|t| !t.is_empty());
        let ordered = node
            .children()
            .filter(|children| children.iter().any(|c| !c.is_text()));
        let has_body = ordered.is_some() || (node.children().is_none() && !node.fields().is_empty());

        self.start_line()?;
        self.open_tag(name, node.attributes())?;

        if !has_body {
            return match text {
                Some(text) => {
                    write!(self.writer, ">")?;
                    self.characters(&text, node.is_cdata())?;
                    write!(self.writer, "</{}>", name)
                }
                None => write!(self.writer, "/>"),
            };
        }

        write!(self.writer, ">")?;
        self.depth += 1;
        match ordered {
            Some(children) => {
                if !children.iter().any(|c| c.is_text()) {
                    if let Some(text) = &text {
                        self.start_line()?;
                        self.characters(text, node.is_cdata())?;
                    }
                }
                for child in children {
                    self.print_child(child)?;
                }
            }
            None => {
                if let Some(text) = &text {
                    self.start_line()?;
                    self.characters(text, node.is_cdata())?;
                }
                for (key, value) in node.fields().iter() {
                    self.print_element(key, value)?;
                }
            }
        }
        self.depth -= 1;

        self.start_line()?;
        write!(self.writer, "</{}>", name)
    }

    fn print_child(&mut self, child: &Node) -> std::io::Result<()> {
        if child.is_comment() {
            let comment = child.text().and_then(Value::scalar_string).unwrap_or_default();
            self.start_line()?;
            return write!(self.writer, "<!--{}-->", comment);
        }
        if child.is_text() {
            let text = child.text().and_then(Value::scalar_string).unwrap_or_default();
            if text.is_empty() {
                return Ok(());
            }
            self.start_line()?;
            return self.characters(&text, false);
        }
        self.print_node(child.name(), child)
    }

    fn start_document(&mut self) -> std::io::Result<()> {
        let decl = &self.options.declaration;
        let mut out = format!("<?xml version=\"{}\"", decl.version);
        if let Some(encoding) = &decl.encoding {
            out.push_str(&format!(" encoding=\"{}\"", encoding));
        }
        if let Some(standalone) = decl.standalone {
            out.push_str(if standalone {
                " standalone=\"yes\""
            } else {
                " standalone=\"no\""
            });
        }
        out.push_str("?>");
        write!(self.writer, "{}", out)?;
        self.at_start = false;
        Ok(())
    }

    fn open_tag(&mut self, name: &str, attrs: Option<&FieldMap<Value>>) -> std::io::Result<()> {
        let mut tag = String::new();
        tag.push('<');
        tag.push_str(name);
        for (key, value) in attrs.into_iter().flat_map(|a| a.iter()) {
            tag.push(' ');
            tag.push_str(key);
            tag.push_str("=\"");
            tag.push_str(&to_entities(&value.scalar_string().unwrap_or_default(), true));
            tag.push('"');
        }
        write!(self.writer, "{}", tag)
    }

    fn characters(&mut self, text: &str, force_cdata: bool) -> std::io::Result<()> {
        if force_cdata || (self.options.cdata && needs_escaping(text)) {
            write!(self.writer, "{}", wrap_cdata(text))
        } else {
            write!(self.writer, "{}", to_entities(text, false))
        }
    }

    /// Starts a new line at the current depth when pretty printing.
    fn start_line(&mut self) -> std::io::Result<()> {
        if !self.options.pretty {
            return Ok(());
        }
        if !self.at_start {
            write!(self.writer, "{}", self.options.newline)?;
        }
        self.at_start = false;
        write!(self.writer, "{}", self.options.indent.repeat(self.depth))
    }
}

/// True for nodes whose only purpose is to name a single root element.
fn is_wrapper(node: &Node) -> bool {
    node.is_logical_root()
        || (node.name().is_empty()
            && node.fields().len() == 1
            && node.attributes().is_none()
            && node.text().is_none()
            && node.children().is_none())
}

/// Combines the entries of several values into one node.
fn merge_items(items: &[Value]) -> Node {
    let mut merged = Node::new("");
    let mut text = String::new();
    for item in items {
        match item {
            Value::Node(node) => {
                for (key, value) in node.fields().iter() {
                    assign_or_push(merged.fields_mut(), key, value.clone(), false);
                }
            }
            other => text.push_str(&other.scalar_string().unwrap_or_default()),
        }
    }
    if !text.is_empty() {
        merged.set_text(Value::String(text));
    }
    merged
}

fn needs_escaping(text: &str) -> bool {
    text.contains(['&', '<', '>'])
}

fn wrap_cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

/// Converts special characters to XML entities. Quotes are only escaped
/// inside attribute values.
fn to_entities(s: &str, attribute: bool) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if attribute => result.push_str("&quot;"),
            '\r' => result.push_str("&#xD;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a value tree to a string with the given options.
pub fn print_to_string_with(value: &Value, options: XmlPrinterOptions) -> std::io::Result<String> {
    let mut output = Vec::new();
    {
        let mut printer = XmlPrinter::with_options(&mut output, options);
        printer.print(value)?;
    }
    Ok(String::from_utf8_lossy(&output).to_string())
}

/// Prints a value tree to a string on a single line.
pub fn print_to_string(value: &Value) -> std::io::Result<String> {
    print_to_string_with(value, XmlPrinterOptions::compact())
}

/// Prints a value tree to a string with pretty printing.
pub fn print_to_string_pretty(value: &Value) -> std::io::Result<String> {
    print_to_string_with(value, XmlPrinterOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::xml::{parse_str, XmlParser};

    const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

    fn obj(entries: Vec<(&str, Value)>) -> Value {
        let mut node = Node::new("");
        for (key, value) in entries {
            node.fields_mut().insert(key, value);
        }
        Value::node(node)
    }

    fn list(items: &[&str]) -> Value {
        Value::Array(items.iter().map(|s| Value::from(*s)).collect())
    }

    #[test]
    fn test_print_basic_structure() {
        let value = obj(vec![(
            "xml",
            obj(vec![
                ("Label", list(&[""])),
                ("MsgId", list(&["5850440872586764820"])),
            ]),
        )]);
        assert_eq!(
            print_to_string(&value).unwrap(),
            format!("{DECL}<xml><Label/><MsgId>5850440872586764820</MsgId></xml>")
        );
    }

    #[test]
    fn test_custom_declaration() {
        let options = XmlPrinterOptions {
            declaration: XmlDeclaration {
                version: "1.2".to_string(),
                encoding: Some("WTF-8".to_string()),
                standalone: Some(false),
            },
            ..XmlPrinterOptions::compact()
        };
        assert_eq!(
            print_to_string_with(&obj(vec![]), options).unwrap(),
            r#"<?xml version="1.2" encoding="WTF-8" standalone="no"?><root/>"#
        );
    }

    #[test]
    fn test_pretty_by_default() {
        let value = obj(vec![("xml", obj(vec![("MsgId", list(&["5850440872586764820"]))]))]);
        assert_eq!(
            print_to_string_pretty(&value).unwrap(),
            format!("{DECL}\n<xml>\n <MsgId>5850440872586764820</MsgId>\n</xml>")
        );
    }

    #[test]
    fn test_headless_with_indent() {
        let value = obj(vec![("xml", obj(vec![("MsgId", list(&["1"]))]))]);
        let options = XmlPrinterOptions {
            indent: "    ".to_string(),
            headless: true,
            ..Default::default()
        };
        assert_eq!(
            print_to_string_with(&value, options).unwrap(),
            "<xml>\n    <MsgId>1</MsgId>\n</xml>"
        );
    }

    #[test]
    fn test_root_name() {
        let value = obj(vec![("MsgId", list(&["5850440872586764820"]))]);
        let options = XmlPrinterOptions {
            root_name: Some("FOO".to_string()),
            ..XmlPrinterOptions::compact()
        };
        assert_eq!(
            print_to_string_with(&value, options).unwrap(),
            format!("{DECL}<FOO><MsgId>5850440872586764820</MsgId></FOO>")
        );

        let two = obj(vec![("MsgId", list(&["1"])), ("foo", Value::from("bar"))]);
        assert_eq!(
            print_to_string(&two).unwrap(),
            format!("{DECL}<root><MsgId>1</MsgId><foo>bar</foo></root>")
        );
    }

    #[test]
    fn test_null_renders_empty_element() {
        let value = obj(vec![("node", Value::from("string")), ("anothernode", Value::Null)]);
        assert_eq!(
            print_to_string(&value).unwrap(),
            format!("{DECL}<root><node>string</node><anothernode/></root>")
        );
    }

    #[test]
    fn test_escapes_text() {
        let value = obj(vec![("xml", obj(vec![("MsgId", list(&["&amp;&lt;&gt;"]))]))]);
        assert!(print_to_string(&value)
            .unwrap()
            .contains("<MsgId>&amp;amp;&amp;lt;&amp;gt;</MsgId>"));
    }

    #[test]
    fn test_cdata_only_when_needed() {
        let value = obj(vec![(
            "xml",
            obj(vec![
                ("MsgId", list(&["& <<]]>"])),
                ("Message", list(&["Hello"])),
                ("Count", Value::Array(vec![Value::Number(10.0), Value::Number(12.0)])),
            ]),
        )]);
        let options = XmlPrinterOptions {
            cdata: true,
            ..Default::default()
        };
        assert_eq!(
            print_to_string_with(&value, options).unwrap(),
            format!(
                "{DECL}\n<xml>\n <MsgId><![CDATA[& <<]]]]><![CDATA[>]]></MsgId>\n <Message>Hello</Message>\n <Count>10</Count>\n <Count>12</Count>\n</xml>"
            )
        );
    }

    #[test]
    fn test_array_root_merges_items() {
        let value = Value::Array(vec![
            obj(vec![("MsgId", Value::Number(10.0))]),
            obj(vec![("MsgId2", Value::Number(12.0))]),
        ]);
        assert_eq!(
            print_to_string(&value).unwrap(),
            format!("{DECL}<root><MsgId>10</MsgId><MsgId2>12</MsgId2></root>")
        );
    }

    #[test]
    fn test_attributes_are_escaped() {
        let tree = parse_str(r#"<root attr="&amp;&lt;&gt;&quot;">x</root>"#).unwrap().unwrap();
        let output = print_to_string(&tree).unwrap();
        assert!(output.contains(r#"<root attr="&amp;&lt;&gt;&quot;">x</root>"#));
    }

    #[test]
    fn test_ordered_children_with_comments() {
        let parser = XmlParser::new(
            ParseOptions::default()
                .with_explicit_children(true)
                .with_preserve_children_order(true)
                .with_chars_as_children(true),
        )
        .unwrap();
        let tree = parser
            .parse_str("<p>one <b>two</b><!--c--> three</p>")
            .unwrap()
            .unwrap();
        let output = print_to_string_with(
            &tree,
            XmlPrinterOptions {
                headless: true,
                ..XmlPrinterOptions::compact()
            },
        )
        .unwrap();
        assert_eq!(output, "<p>one <b>two</b><!--c--> three</p>");
    }

    #[test]
    fn test_round_trip() {
        let xml = r#"<doc><section id="s1"><para>First paragraph.</para><para>Second paragraph.</para></section><empty/></doc>"#;
        let tree1 = parse_str(xml).unwrap().unwrap();
        let output1 = print_to_string(&tree1).unwrap();
        assert_eq!(output1, format!("{DECL}{xml}"));
        // Positions shift by the declaration, so compare the second rendering.
        let tree2 = parse_str(&output1).unwrap().unwrap();
        assert_eq!(print_to_string(&tree2).unwrap(), output1);
    }

    #[test]
    fn test_round_trip_with_explicit_root_off() {
        let parser = XmlParser::new(ParseOptions::default().with_explicit_root(false)).unwrap();
        let xml = r#"<a x="1"><b>t</b></a>"#;
        let tree = parser.parse_str(xml).unwrap().unwrap();
        assert_eq!(print_to_string(&tree).unwrap(), format!("{DECL}{xml}"));
    }
}
