//! XML parsing and output.
//!
//! Parsing drives quick-xml's namespace-aware reader and feeds its events to
//! the tree builder. Printing renders a parsed (or hand-built) value tree back
//! to XML text.

mod locator;
mod parser;
mod printer;
mod task;

pub use parser::{parse_file, parse_str, XmlParser};
pub use printer::{
    print_to_string, print_to_string_pretty, print_to_string_with, XmlDeclaration, XmlPrinter,
    XmlPrinterOptions,
};
pub use task::ParseTask;
