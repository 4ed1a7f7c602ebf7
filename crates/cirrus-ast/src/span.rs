//! Source location tracking.
//!
//! # Design
//!
//! - `TextSpan`: half-open byte range `[start, end)` into one file's text
//! - `LineStarts`: sorted offsets of every line start, for converting byte
//!   offsets to zero-based `(line, column)` pairs and back
//!
//! Line breaks are `\r\n`, `\r` or `\n`; a `\r\n` pair counts as a single
//! break, so files with mixed line endings map consistently.
//!
//! # Examples
//!
//! ```
//! # use cirrus_ast::span::*;
//! let lines = LineStarts::new("param a string\r\nvar b = a");
//! assert_eq!(lines.position_at(16), (1, 0));
//! assert_eq!(lines.offset_at(1, 4), Some(20));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open byte range in a single source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TextSpan {
    /// Byte offset of the first byte
    pub start: u32,
    /// Byte offset one past the last byte
    pub end: u32,
}

impl TextSpan {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `end < start`.
    pub fn new(start: u32, end: u32) -> Self {
        assert!(end >= start, "malformed span: end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Zero-length span at `offset`.
    pub fn empty(offset: u32) -> Self {
        Self::new(offset, offset)
    }

    /// Span from a `usize` byte range, as produced by the lexer.
    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Span covering both `self` and `other`.
    pub fn merge(&self, other: &TextSpan) -> TextSpan {
        TextSpan {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Extend this span to include another span.
    pub fn extend(&mut self, other: &TextSpan) {
        *self = self.merge(other);
    }

    /// True if `offset` lies inside the span, or at its end.
    pub fn contains(&self, offset: u32) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Slice the text this span covers.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start as usize..self.end as usize]
    }
}

impl fmt::Display for TextSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{}]", self.start, self.end)
    }
}

/// Sorted table of line start offsets.
///
/// `starts[0]` is always 0. There is one entry per line; a file ending in a
/// line break has a final, empty line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineStarts {
    starts: Vec<u32>,
    len: u32,
}

impl LineStarts {
    pub fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut starts = vec![0];
        let mut idx = 0;
        while idx < bytes.len() {
            match bytes[idx] {
                b'\r' if bytes.get(idx + 1) == Some(&b'\n') => {
                    idx += 2;
                    starts.push(idx as u32);
                }
                b'\r' | b'\n' => {
                    idx += 1;
                    starts.push(idx as u32);
                }
                _ => idx += 1,
            }
        }
        Self {
            starts,
            len: text.len() as u32,
        }
    }

    /// Number of lines (always at least one).
    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.starts
    }

    /// Zero-based `(line, column)` of a byte offset. Columns count bytes.
    ///
    /// Offsets past the end clamp to the end of the text.
    pub fn position_at(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.len);
        let line_idx = match self.starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };
        (line_idx as u32, offset - self.starts[line_idx])
    }

    /// Byte offset of a zero-based `(line, column)` pair.
    ///
    /// Returns `None` when the line does not exist; columns past the end of
    /// the line clamp to the start of the next line.
    pub fn offset_at(&self, line: u32, column: u32) -> Option<u32> {
        let start = *self.starts.get(line as usize)?;
        let next = self
            .starts
            .get(line as usize + 1)
            .copied()
            .unwrap_or(self.len);
        Some((start + column).min(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_and_extend() {
        let a = TextSpan::new(10, 20);
        let b = TextSpan::new(15, 30);
        assert_eq!(a.merge(&b), TextSpan::new(10, 30));

        let mut c = TextSpan::empty(5);
        c.extend(&a);
        assert_eq!(c, TextSpan::new(5, 20));
        assert_eq!(c.len(), 15);
    }

    #[test]
    #[should_panic(expected = "malformed span")]
    fn test_span_new_panics_on_inverted() {
        let _ = TextSpan::new(10, 5);
    }

    #[test]
    fn test_line_starts_mixed_endings() {
        let lines = LineStarts::new("a\nb\r\nc\rd");
        assert_eq!(lines.as_slice(), &[0, 2, 5, 7]);
        assert_eq!(lines.line_count(), 4);
    }

    #[test]
    fn test_trailing_line_break_adds_empty_line() {
        let lines = LineStarts::new("abc\n");
        assert_eq!(lines.as_slice(), &[0, 4]);
        assert_eq!(lines.position_at(4), (1, 0));
    }

    #[test]
    fn test_position_round_trip() {
        let text = "param foo string\r\noutput bar string = foo\n";
        let lines = LineStarts::new(text);
        for offset in 0..=text.len() as u32 {
            let (line, col) = lines.position_at(offset);
            assert_eq!(lines.offset_at(line, col), Some(offset), "offset {offset}");
        }
    }

    #[test]
    fn test_offset_at_out_of_range() {
        let lines = LineStarts::new("ab\ncd");
        assert_eq!(lines.offset_at(5, 0), None);
        assert_eq!(lines.offset_at(0, 99), Some(3));
        assert_eq!(lines.position_at(99), (1, 2));
    }
}
