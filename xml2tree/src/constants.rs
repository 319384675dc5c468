//! Constants used throughout xml2tree.

/// Name given to synthetic nodes holding a text fragment in the ordered
/// children list.
pub const TEXT_NODE_NAME: &str = "__text__";

/// Name given to comment nodes in the ordered children list.
pub const COMMENT_NODE_NAME: &str = "__comment__";

/// Default number of input bytes fed to the tokenizer per streaming step.
pub const DEFAULT_CHUNK_SIZE: usize = 10_000;

/// Default JSON key for the attribute map.
pub const DEFAULT_ATTR_KEY: &str = "$";

/// Default JSON key for character data.
pub const DEFAULT_CHAR_KEY: &str = "_";

/// Default JSON key for explicit children.
pub const DEFAULT_CHILD_KEY: &str = "$$";

/// JSON key carrying a node's name inside an ordered children array.
pub const NAME_KEY: &str = "#name";

/// Root element name used by the printer when a tree has no single root.
pub const DEFAULT_ROOT_NAME: &str = "root";
