//! Span-based text editing.
//!
//! Rewriters never rebuild a file from a tree. They compute a set of
//! [`TextEdit`]s against the original source and apply them in one pass, so
//! every byte outside an edited span is carried over untouched.
//!
//! # Example
//!
//! ```
//! use migtool_core::patch::{Span, SpanEditor, TextEdit};
//!
//! let source = "namespace Acme.Core;\n";
//! let mut editor = SpanEditor::new(source);
//! editor.add(TextEdit::replace(Span::new(10, 19), "Acme.Core.V2"));
//! assert_eq!(editor.apply().unwrap(), "namespace Acme.Core.V2;\n");
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Byte offsets into source text.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span. An inverted range collapses to `start`.
    pub fn new(start: usize, end: usize) -> Self {
        Span {
            start,
            end: end.max(start),
        }
    }

    /// Zero-width span at `offset`.
    pub fn empty(offset: usize) -> Self {
        Span::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Two spans overlap if they share any byte positions.
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest span covering both.
    pub fn cover(&self, other: &Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// The text under this span, if in bounds.
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.start..self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Replace `span` with `new_text`. Insertions use an empty span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub span: Span,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(span: Span, new_text: impl Into<String>) -> Self {
        TextEdit {
            span,
            new_text: new_text.into(),
        }
    }

    pub fn delete(span: Span) -> Self {
        TextEdit::replace(span, "")
    }

    pub fn insert_at(offset: usize, text: impl Into<String>) -> Self {
        TextEdit::replace(Span::empty(offset), text)
    }

    pub fn is_insertion(&self) -> bool {
        self.span.is_empty()
    }
}

/// Errors from [`SpanEditor::apply`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("overlapping edits: {first} and {second}")]
    OverlappingEdits { first: Span, second: Span },

    #[error("span {span} is out of bounds for source of length {source_len}")]
    SpanOutOfBounds { span: Span, source_len: usize },

    #[error("span {span} does not fall on character boundaries")]
    NotCharBoundary { span: Span },
}

/// Collects edits against one source text and applies them atomically.
#[derive(Debug)]
pub struct SpanEditor<'src> {
    source: &'src str,
    edits: Vec<TextEdit>,
}

impl<'src> SpanEditor<'src> {
    pub fn new(source: &'src str) -> Self {
        SpanEditor {
            source,
            edits: Vec::new(),
        }
    }

    pub fn add(&mut self, edit: TextEdit) {
        self.edits.push(edit);
    }

    pub fn add_all(&mut self, edits: impl IntoIterator<Item = TextEdit>) {
        self.edits.extend(edits);
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Apply all queued edits and return the transformed source.
    ///
    /// Edits are applied in reverse position order so earlier spans stay
    /// valid. An empty batch returns the source unchanged.
    ///
    /// # Errors
    ///
    /// - `EditError::SpanOutOfBounds` if any span exceeds the source length
    /// - `EditError::NotCharBoundary` if a span splits a UTF-8 character
    /// - `EditError::OverlappingEdits` if any two non-empty spans overlap
    pub fn apply(mut self) -> Result<String, EditError> {
        let source_len = self.source.len();

        for edit in &self.edits {
            let span = edit.span;
            if span.end > source_len {
                return Err(EditError::SpanOutOfBounds { span, source_len });
            }
            if !self.source.is_char_boundary(span.start) || !self.source.is_char_boundary(span.end)
            {
                return Err(EditError::NotCharBoundary { span });
            }
        }

        // Descending by start; at equal starts, replacements before insertions
        // so inserted text lands ahead of the replaced region.
        self.edits.sort_by(|a, b| match b.span.start.cmp(&a.span.start) {
            Ordering::Equal => match (a.is_insertion(), b.is_insertion()) {
                (false, true) => Ordering::Less,
                (true, false) => Ordering::Greater,
                _ => Ordering::Equal,
            },
            other => other,
        });

        for pair in self.edits.windows(2) {
            let (later, earlier) = (pair[0].span, pair[1].span);
            if earlier.overlaps(&later) || (earlier == later && !earlier.is_empty()) {
                return Err(EditError::OverlappingEdits {
                    first: earlier,
                    second: later,
                });
            }
        }

        let mut result = self.source.to_string();
        for edit in &self.edits {
            result.replace_range(edit.span.start..edit.span.end, &edit.new_text);
        }
        Ok(result)
    }
}
