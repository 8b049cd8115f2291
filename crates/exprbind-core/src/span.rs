//! Source position tracking for error reporting.
//!
//! Syntax nodes may carry a [`Span`] so that binding errors can point back
//! at the position in whatever surface text the tree was produced from.

use std::fmt;

/// A position in the source the syntax tree was parsed from.
///
/// Tracks the line:column where the offending construct starts plus its
/// length in bytes. Trees assembled programmatically usually leave spans
/// unset; errors then render without a position suffix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a new span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    /// Whether this span is empty (zero length).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Renders `" at line:col"` for an optional span, or nothing when absent.
///
/// Used by the error types so positionless errors stay terse.
pub struct MaybeSpan<'a>(pub &'a Option<Span>);

impl fmt::Display for MaybeSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(span) => write!(f, " at {span}"),
            None => Ok(()),
        }
    }
}
