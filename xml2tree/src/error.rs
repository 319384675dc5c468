//! Error types for xml2tree.

use thiserror::Error;

use crate::validator::ValidationError;

/// Result type alias for xml2tree operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or rendering a tree.
///
/// Every parse ends in exactly one of: a result, `None` for empty input, or
/// one of these errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed markup reported by the tokenizer or by strict-mode checks.
    #[error("{message} (line {line}, column {column}{})", fmt_char(.character))]
    Syntax {
        /// Description of the problem.
        message: String,
        /// 1-based line of the offending input.
        line: usize,
        /// 1-based column of the offending input.
        column: usize,
        /// The character at the error position, if any input remained.
        character: Option<char>,
    },

    /// The validator hook rejected a node.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A close event arrived with no element open.
    ///
    /// The tokenizer never produces this for well-formed input; seeing it means
    /// the tokenizer and the builder disagree about nesting.
    #[error("close tag received with no open element")]
    UnmatchedClose,

    /// The parse options failed validation.
    #[error("invalid parse options: {0}")]
    Config(String),

    /// A streaming parse was polled after it had already completed.
    #[error("parse task already finished")]
    Finished,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_char(character: &Option<char>) -> String {
    match character {
        Some(c) => format!(", char {:?}", c),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_display_includes_location() {
        let err = Error::Syntax {
            message: "Unclosed root tag".to_string(),
            line: 1,
            column: 7,
            character: None,
        };
        assert_eq!(err.to_string(), "Unclosed root tag (line 1, column 7)");

        let err = Error::Syntax {
            message: "Invalid element name".to_string(),
            line: 2,
            column: 2,
            character: Some('<'),
        };
        assert_eq!(
            err.to_string(),
            "Invalid element name (line 2, column 2, char '<')"
        );
    }

    #[test]
    fn test_validation_message_is_preserved() {
        let err: Error = ValidationError::new("Validation error!").into();
        assert_eq!(err.to_string(), "Validation error!");
    }
}
