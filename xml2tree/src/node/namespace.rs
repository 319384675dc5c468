//! Namespace metadata for elements and attributes.

/// Namespace information attached to a node when `xmlns` tracking is on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    /// The prefix as written in the document (empty for the default namespace).
    pub prefix: String,
    /// The local part of the name (without prefix).
    pub local: String,
    /// The namespace URI the prefix resolved to.
    pub uri: String,
}

impl Namespace {
    /// Creates namespace metadata.
    pub fn new(
        prefix: impl Into<String>,
        local: impl Into<String>,
        uri: impl Into<String>,
    ) -> Self {
        Self {
            prefix: prefix.into(),
            local: local.into(),
            uri: uri.into(),
        }
    }
}

/// Splits a qualified name into prefix and local name.
///
/// Returns (Some(prefix), local) for "prefix:local"
/// Returns (None, name) for "name" without prefix
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    if let Some(pos) = qname.find(':') {
        (Some(&qname[..pos]), &qname[pos + 1..])
    } else {
        (None, qname)
    }
}

/// Checks if an attribute name is a namespace declaration.
pub fn is_xmlns_attr(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_qname() {
        assert_eq!(split_qname("pfx:top"), (Some("pfx"), "top"));
        assert_eq!(split_qname("top"), (None, "top"));
    }

    #[test]
    fn test_is_xmlns_attr() {
        assert!(is_xmlns_attr("xmlns"));
        assert!(is_xmlns_attr("xmlns:pfx"));
        assert!(!is_xmlns_attr("xmlnsx"));
        assert!(!is_xmlns_attr("pfx:attr"));
    }
}
