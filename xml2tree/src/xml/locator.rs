//! Byte offset to line/column translation.

use crate::node::Position;

/// Converts byte offsets into 1-based line and column numbers.
///
/// Offsets reported by the tokenizer only grow while parsing, so the locator
/// remembers where it stopped and scans forward from there. Asking for an
/// earlier offset restarts the scan from the beginning.
#[derive(Debug, Clone)]
pub(crate) struct Locator<'a> {
    input: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Locator<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Locator {
            input,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Returns the position of the byte at `offset`.
    pub(crate) fn locate(&mut self, offset: usize) -> Position {
        let offset = floor_char_boundary(self.input, offset);
        if offset < self.offset {
            self.offset = 0;
            self.line = 1;
            self.column = 1;
        }
        for c in self.input[self.offset..offset].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset = offset;
        Position {
            line: self.line,
            column: self.column,
            offset,
        }
    }

    /// Returns the character at `offset`, if any input remains there.
    pub(crate) fn char_at(&self, offset: usize) -> Option<char> {
        let offset = floor_char_boundary(self.input, offset);
        self.input[offset..].chars().next()
    }
}

fn floor_char_boundary(s: &str, offset: usize) -> usize {
    let mut offset = offset.min(s.len());
    while !s.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_counts_lines_and_columns() {
        let mut locator = Locator::new("<a>\n  <b/>\n</a>");
        assert_eq!(locator.locate(0), Position { line: 1, column: 1, offset: 0 });
        let b = locator.locate(6);
        assert_eq!((b.line, b.column), (2, 3));
        let end = locator.locate(11);
        assert_eq!((end.line, end.column), (3, 1));
    }

    #[test]
    fn test_locate_backwards_restarts() {
        let mut locator = Locator::new("ab\ncd");
        assert_eq!(locator.locate(4).line, 2);
        assert_eq!(locator.locate(1), Position { line: 1, column: 2, offset: 1 });
    }

    #[test]
    fn test_columns_count_characters() {
        let mut locator = Locator::new("äö<x/>");
        let pos = locator.locate(4);
        assert_eq!(pos.column, 3);
        assert_eq!(locator.char_at(4), Some('<'));
        // Offsets inside a multi-byte character snap back to its start.
        assert_eq!(locator.locate(1).offset, 0);
        assert_eq!(locator.char_at(100), None);
    }
}
