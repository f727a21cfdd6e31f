//! Recovery notes produced while tolerantly parsing markup.

use thiserror::Error;

/// Upper bound on syntax errors skipped before the parser gives up on the rest of the input.
pub const MAX_SYNTAX_RECOVERIES: usize = 64;

/// Deepest element nesting kept in the tree; deeper elements are re-parented.
pub const MAX_NESTING_DEPTH: usize = 256;

/// A problem the tolerant parser recovered from.
///
/// None of these abort parsing; they are surfaced as
/// [`CitationWarning::MalformedMarkup`](crate::CitationWarning::MalformedMarkup).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupIssue {
    /// The XML reader rejected part of the input.
    #[error("syntax error at byte {position}: {message}")]
    Syntax {
        /// Byte offset reported by the reader
        position: u64,
        /// Reader error message
        message: String,
    },

    /// An element was still open when its parent closed or input ended.
    #[error("element <{name}> was never closed")]
    UnclosedElement {
        /// Qualified name of the element
        name: String,
    },

    /// A closing tag had no matching open element.
    #[error("stray closing tag </{name}> ignored")]
    StrayEndTag {
        /// Qualified name in the closing tag
        name: String,
    },

    /// Too many syntax errors; the remainder of the input was dropped.
    #[error("gave up after {count} syntax errors; remaining input ignored")]
    TooManyErrors {
        /// Number of recovered errors
        count: usize,
    },

    /// Nesting exceeded [`MAX_NESTING_DEPTH`]; deeper elements became siblings.
    #[error("element nesting deeper than {limit} levels flattened")]
    NestingTooDeep {
        /// Depth limit that was hit
        limit: usize,
    },

    /// Input contained no elements at all.
    #[error("document contains no elements")]
    NoElements,
}

impl MarkupIssue {
    /// Creates a `Syntax` issue from a reader error.
    #[must_use]
    pub fn syntax(position: u64, error: &impl std::fmt::Display) -> Self {
        Self::Syntax {
            position,
            message: error.to_string(),
        }
    }
}
