//! Source locations consumed from the (external) parser's AST.
//!
//! Shaped after the teacher's `parse::CodeRange`: a filename id plus
//! start/end line-column pairs and an optional single-line preview index
//! used by the error formatter to pull the offending source line.

use std::fmt;

use crate::intern::StrId;

/// Zero-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl LineCol {
    #[must_use]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

/// A source range, carried on every AST node and every error annotation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub file: StrId,
    preview_line: Option<u32>,
    start: LineCol,
    end: LineCol,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span{{file: {:?}, start: {:?}, end: {:?}}}", self.file, self.start, self.end)
    }
}

impl Span {
    #[must_use]
    pub const fn new(file: StrId, start: LineCol, end: LineCol) -> Self {
        let preview_line = if start.line == end.line { Some(start.line) } else { None };
        Self { file, preview_line, start, end }
    }

    #[must_use]
    pub const fn start(&self) -> LineCol {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> LineCol {
        self.end
    }

    #[must_use]
    pub fn preview_line(&self) -> Option<u32> {
        self.preview_line
    }

    /// Returns a span extended to cover `other` as well, used when merging
    /// a sub-expression's span into its parent's during AST construction.
    #[must_use]
    pub fn to(&self, other: Span) -> Span {
        Span::new(self.file, self.start, other.end)
    }
}

/// Holds the source text for each loaded file, keyed by the same `StrId`
/// used in `Span::file`, so the error formatter can print caret-underlined
/// excerpts without threading the original source text through every AST
/// node individually.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: ahash::AHashMap<StrId, String>,
}

impl SourceMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: StrId, source: String) {
        self.files.insert(file, source);
    }

    #[must_use]
    pub fn line(&self, file: StrId, line: u32) -> Option<&str> {
        self.files.get(&file)?.lines().nth(line as usize)
    }
}
