//! Byte spans and line/column lookup.

use text_size::{TextRange, TextSize};

/// A byte offset into a stylesheet source.
pub type ByteOffset = TextSize;

/// A half-open byte range `[start, end)` in a stylesheet source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// The start byte offset (inclusive).
    pub start: ByteOffset,
    /// The end byte offset (exclusive).
    pub end: ByteOffset,
}

impl Span {
    /// Creates a new span from start and end byte offsets.
    #[inline]
    pub fn new(start: impl Into<ByteOffset>, end: impl Into<ByteOffset>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Creates an empty span at the given offset.
    #[inline]
    pub fn empty(offset: impl Into<ByteOffset>) -> Self {
        let offset = offset.into();
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Builds a span from `usize` offsets as produced by the lexer.
    pub(crate) fn from_usize(start: usize, end: usize) -> Self {
        Self::new(TextSize::from(start as u32), TextSize::from(end as u32))
    }

    /// Returns true if this span is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns a span covering both this span and another.
    #[inline]
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: std::cmp::min(self.start, other.start),
            end: std::cmp::max(self.end, other.end),
        }
    }

    /// Returns the slice of `source` covered by this span.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let start = u32::from(self.start) as usize;
        let end = u32::from(self.end) as usize;
        source.get(start..end).unwrap_or("")
    }
}

impl From<TextRange> for Span {
    fn from(range: TextRange) -> Self {
        Self {
            start: range.start(),
            end: range.end(),
        }
    }
}

/// A 0-indexed line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line.
    pub line: u32,
    /// 0-indexed byte column within the line.
    pub col: u32,
}

/// Offset to line/column conversion over one source text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<ByteOffset>,
}

impl LineIndex {
    /// Indexes the line starts of `text`.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        line_starts.extend(
            text.match_indices('\n')
                .map(|(offset, _)| TextSize::from((offset + 1) as u32)),
        );
        Self { line_starts }
    }

    /// Converts a byte offset to a line/column position.
    pub fn line_col(&self, offset: ByteOffset) -> LineCol {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        let col = u32::from(offset) - u32::from(self.line_starts[line]);
        LineCol {
            line: line as u32,
            col,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_cover() {
        let a = Span::new(5u32, 10u32);
        let b = Span::new(8u32, 20u32);
        let covered = a.cover(b);
        assert_eq!(covered.start, TextSize::from(5));
        assert_eq!(covered.end, TextSize::from(20));
    }

    #[test]
    fn test_span_text() {
        let span = Span::new(1u32, 4u32);
        assert_eq!(span.text(".root{}"), "roo");
        assert_eq!(Span::new(10u32, 40u32).text("short"), "");
    }

    #[test]
    fn test_line_col() {
        let index = LineIndex::new(".a {}\n.b {\n  color: red;\n}");
        assert_eq!(index.line_col(TextSize::from(0)), LineCol { line: 0, col: 0 });
        assert_eq!(index.line_col(TextSize::from(6)), LineCol { line: 1, col: 0 });
        assert_eq!(index.line_col(TextSize::from(13)), LineCol { line: 2, col: 2 });
    }
}
