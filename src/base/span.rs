//! Source text positions and ranges.

use std::fmt;

pub use text_size::TextRange;
pub use text_size::TextSize;

/// A half-open byte range `[start, end)` into an immutable source buffer.
///
/// A span never owns text; slice the source with [`Span::slice`] when the
/// characters are needed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, PartialOrd, Ord)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Create a span. `end` is clamped so the span is never inverted.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        let end = if end < start { start } else { end };
        Self { start, end }
    }

    /// A zero-length span at `offset`.
    #[inline]
    pub const fn empty(offset: u32) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[inline]
    pub const fn len(self) -> u32 {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Check if a byte offset falls within this span.
    #[inline]
    pub const fn contains(self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Check if `other` lies entirely within this span (inclusive ends).
    #[inline]
    pub const fn contains_span(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Strict overlap: the spans share at least one byte.
    ///
    /// Zero-length spans overlap nothing.
    #[inline]
    pub const fn overlaps(self, other: Span) -> bool {
        !self.is_empty() && !other.is_empty() && self.start < other.end && other.start < self.end
    }

    /// The smallest span covering both.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The shared part of both spans, if they touch or overlap.
    #[inline]
    pub fn intersect(self, other: Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(Span { start, end })
    }

    /// Slice the source text covered by this span.
    ///
    /// Returns an empty string when the span is out of bounds or not on a
    /// char boundary.
    pub fn slice(self, source: &str) -> &str {
        source
            .get(self.start as usize..self.end as usize)
            .unwrap_or("")
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<TextRange> for Span {
    fn from(range: TextRange) -> Self {
        Span::new(range.start().into(), range.end().into())
    }
}

impl From<Span> for TextRange {
    fn from(span: Span) -> Self {
        TextRange::new(TextSize::new(span.start), TextSize::new(span.end))
    }
}

/// Maps offsets of the previous generation onto the next one for a single
/// edit replacing `range` with `new_len` bytes.
///
/// Positions before the edit are unchanged, positions at or after its end
/// move by the length difference. A start inside the replaced range snaps to
/// the start of the edit, an end inside it snaps to the end of the new text.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct EditMap {
    pub range: Span,
    pub new_len: u32,
}

impl EditMap {
    pub const fn new(range: Span, new_len: u32) -> Self {
        Self { range, new_len }
    }

    /// Bytes added (positive) or removed (negative) by the edit.
    #[inline]
    pub const fn delta(&self) -> i64 {
        self.new_len as i64 - self.range.len() as i64
    }

    /// An edit that replaces nothing with nothing.
    #[inline]
    pub const fn is_noop(&self) -> bool {
        self.range.is_empty() && self.new_len == 0
    }

    /// The replaced range expressed in new-generation offsets.
    #[inline]
    pub const fn new_range(&self) -> Span {
        Span::new(self.range.start, self.range.start + self.new_len)
    }

    #[inline]
    fn shift(&self, offset: u32) -> u32 {
        (offset as i64 + self.delta()).max(0) as u32
    }

    pub fn map_start(&self, offset: u32) -> u32 {
        if offset < self.range.start {
            offset
        } else if offset >= self.range.end {
            self.shift(offset)
        } else {
            self.range.start
        }
    }

    pub fn map_end(&self, offset: u32) -> u32 {
        if offset <= self.range.start {
            offset
        } else if offset >= self.range.end {
            self.shift(offset)
        } else {
            self.range.start + self.new_len
        }
    }

    pub fn map_span(&self, span: Span) -> Span {
        if span.is_empty() {
            let at = self.map_start(span.start);
            return Span::empty(at);
        }
        Span::new(self.map_start(span.start), self.map_end(span.end))
    }

    /// Whether an old-generation span is touched by the replaced range.
    ///
    /// Insertions touch spans that strictly contain the insertion point.
    pub fn touches(&self, span: Span) -> bool {
        if self.range.is_empty() {
            span.start < self.range.start && self.range.start < span.end
        } else {
            span.overlaps(self.range)
        }
    }
}

/// A line and column position in source text.
///
/// Both line and column are 0-indexed internally, but displayed as 1-indexed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct LineCol {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed column (in UTF-8 bytes, not characters)
    pub col: u32,
}

impl LineCol {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Get 1-indexed line number (for display).
    #[inline]
    pub const fn line_one_indexed(self) -> u32 {
        self.line + 1
    }

    /// Get 1-indexed column number (for display).
    #[inline]
    pub const fn col_one_indexed(self) -> u32 {
        self.col + 1
    }
}

impl fmt::Debug for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line_one_indexed(), self.col_one_indexed())
    }
}

/// Index for converting between byte offsets and line/column positions.
#[derive(Clone, Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    /// Build a line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(offset, _)| TextSize::from((offset + 1) as u32)),
        );
        Self { line_starts }
    }

    /// Convert a byte offset to a line/column position.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let col = offset - self.line_starts[line];
        LineCol {
            line: line as u32,
            col: col.into(),
        }
    }

    /// Convert a line/column position to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let line_start = self.line_starts.get(line_col.line as usize)?;
        Some(*line_start + TextSize::from(line_col.col))
    }

    /// Get the number of lines.
    pub fn len(&self) -> usize {
        self.line_starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line_starts.is_empty()
    }
}
