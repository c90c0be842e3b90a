//! Parse error types.

use crate::span::Span;
use thiserror::Error;

/// An error that occurred during parsing.
#[derive(Debug, Clone, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// The kind of error.
    pub kind: ParseErrorKind,
    /// The location in the source where the error occurred.
    pub span: Span,
}

impl ParseError {
    /// Creates a new parse error.
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The kind of parse error.
#[derive(Debug, Clone, Error)]
pub enum ParseErrorKind {
    /// A block was opened but never closed.
    #[error("unclosed block")]
    UnclosedBlock,

    /// A `}` appeared without a matching `{`.
    #[error("unexpected '}}'")]
    UnexpectedCloseBrace,

    /// Text that is neither a rule nor a declaration.
    #[error("unknown word: {word}")]
    UnknownWord {
        /// The offending text.
        word: String,
    },

    /// An at-rule without a name.
    #[error("invalid at-rule: {text}")]
    InvalidAtRule {
        /// The offending text.
        text: String,
    },
}
