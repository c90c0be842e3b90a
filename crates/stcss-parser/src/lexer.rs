//! Stylesheet lexer using logos.
//!
//! The lexer only splits the source into the coarse pieces the stylesheet
//! parser needs to find statement boundaries: braces, semicolons, colons,
//! parentheses, strings, comments and at-keywords. Everything else is a word,
//! and selectors and values are re-read from the source text by their own
//! parsers.

use crate::span::Span;
use logos::Logos;
use text_size::TextSize;

/// A token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The span of the token in the source.
    pub span: Span,
}

/// Token kinds for stylesheet syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Logos, Default)]
pub enum TokenKind {
    /// Whitespace run.
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    /// `/* ... */`
    #[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
    Comment,

    /// A double or single quoted string.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    String,

    /// `@name`
    #[regex(r"@[a-zA-Z_\-][a-zA-Z0-9_\-]*")]
    AtKeyword,

    /// `{`
    #[token("{")]
    LBrace,

    /// `}`
    #[token("}")]
    RBrace,

    /// `;`
    #[token(";")]
    Semicolon,

    /// `:`
    #[token(":")]
    Colon,

    /// `(`
    #[token("(")]
    LParen,

    /// `)`
    #[token(")")]
    RParen,

    /// `/` outside of a comment.
    #[token("/")]
    Slash,

    /// Any other run of characters, including escapes.
    #[regex(r#"([^ \t\r\n\f{};:()'"@/\\]|\\.)+"#)]
    Word,

    /// End of file
    Eof,

    /// Invalid/unknown token
    #[default]
    Error,
}

impl TokenKind {
    /// Returns a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Whitespace => "whitespace",
            TokenKind::Comment => "comment",
            TokenKind::String => "string",
            TokenKind::AtKeyword => "at-keyword",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Semicolon => "';'",
            TokenKind::Colon => "':'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Slash => "'/'",
            TokenKind::Word => "word",
            TokenKind::Eof => "end of file",
            TokenKind::Error => "invalid token",
        }
    }

    /// Returns true for tokens that carry no meaning between statements.
    pub fn is_trivia(&self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A lexer for stylesheet source code.
pub struct Lexer<'src> {
    inner: logos::Lexer<'src, TokenKind>,
    source: &'src str,
    finished: bool,
}

impl<'src> Lexer<'src> {
    /// Creates a new lexer for the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            inner: TokenKind::lexer(source),
            source,
            finished: false,
        }
    }

    /// Returns the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.inner.next() {
            Some(result) => {
                let span = self.inner.span();
                Some(Token {
                    kind: result.unwrap_or(TokenKind::Error),
                    span: Span::from_usize(span.start, span.end),
                })
            }
            None => {
                self.finished = true;
                let end = TextSize::from(self.source.len() as u32);
                Some(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(end, end),
                })
            }
        }
    }
}
