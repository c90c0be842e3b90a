//! Recursive descent parser for stylesheets.

use crate::ast::*;
use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::span::Span;
use crate::ParseResult;
use smol_str::SmolStr;
use text_size::TextSize;

/// The stylesheet parser.
pub struct Parser<'src> {
    /// The source being parsed.
    source: &'src str,
    /// The token stream, without the trailing EOF token.
    tokens: Vec<Token>,
    /// Current position in the token stream.
    pos: usize,
    /// Parse errors collected during parsing.
    errors: Vec<ParseError>,
    /// Next rule id to hand out.
    next_rule_id: u32,
    /// EOF token for when we're past the end.
    eof_token: Token,
}

/// Where a statement scan stopped.
struct StatementEnd {
    /// Index of the terminating token (or `tokens.len()` at EOF).
    index: usize,
    /// The terminating token kind.
    kind: TokenKind,
}

impl<'src> Parser<'src> {
    /// Creates a new parser.
    pub fn new(source: &'src str) -> Self {
        let tokens: Vec<Token> = Lexer::new(source)
            .filter(|t| t.kind != TokenKind::Eof)
            .collect();
        let eof_token = Token {
            kind: TokenKind::Eof,
            span: Span::empty(TextSize::from(source.len() as u32)),
        };
        Self {
            source,
            tokens,
            pos: 0,
            errors: Vec::new(),
            next_rule_id: 0,
            eof_token,
        }
    }

    /// Parses the source into a stylesheet.
    pub fn parse(mut self) -> ParseResult {
        let nodes = self.parse_nodes(false);
        ParseResult {
            stylesheet: Stylesheet {
                nodes,
                span: Span::new(
                    TextSize::from(0),
                    TextSize::from(self.source.len() as u32),
                ),
            },
            errors: self.errors,
        }
    }

    // === Token helpers ===

    fn token_at(&self, index: usize) -> &Token {
        self.tokens.get(index).unwrap_or(&self.eof_token)
    }

    fn current(&self) -> &Token {
        self.token_at(self.pos)
    }

    fn current_kind(&self) -> TokenKind {
        self.current().kind
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error(&mut self, kind: ParseErrorKind, span: Span) {
        self.errors.push(ParseError::new(kind, span));
    }

    /// Joins the text of tokens in `[start, end)`, dropping comments.
    fn text_between(&self, start: usize, end: usize) -> String {
        let mut text = String::new();
        for token in &self.tokens[start.min(self.tokens.len())..end.min(self.tokens.len())] {
            if token.kind != TokenKind::Comment {
                text.push_str(token.span.text(self.source));
            }
        }
        text.trim().to_string()
    }

    /// Span from the start of token `start` to the end of token `end - 1`.
    fn span_between(&self, start: usize, end: usize) -> Span {
        let first = self.token_at(start).span;
        if end <= start {
            return Span::empty(first.start);
        }
        first.cover(self.token_at(end - 1).span)
    }

    /// Scans forward from the current position to the end of a statement.
    ///
    /// Braces always terminate; semicolons only outside parentheses.
    fn scan_statement_end(&self) -> StatementEnd {
        let mut depth = 0usize;
        for index in self.pos..self.tokens.len() {
            match self.tokens[index].kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                kind @ (TokenKind::LBrace | TokenKind::RBrace) => {
                    return StatementEnd { index, kind };
                }
                TokenKind::Semicolon if depth == 0 => {
                    return StatementEnd {
                        index,
                        kind: TokenKind::Semicolon,
                    };
                }
                _ => {}
            }
        }
        StatementEnd {
            index: self.tokens.len(),
            kind: TokenKind::Eof,
        }
    }

    // === Grammar ===

    /// Parses nodes until EOF or, inside a block, until the closing brace.
    fn parse_nodes(&mut self, nested: bool) -> Vec<Node> {
        let mut nodes = Vec::new();
        loop {
            match self.current_kind() {
                TokenKind::Whitespace | TokenKind::Semicolon => self.advance(),
                TokenKind::Eof => break,
                TokenKind::RBrace => {
                    if nested {
                        break;
                    }
                    self.error(ParseErrorKind::UnexpectedCloseBrace, self.current().span);
                    self.advance();
                }
                TokenKind::Comment => {
                    let span = self.current().span;
                    let raw = span.text(self.source);
                    let text = raw
                        .strip_prefix("/*")
                        .and_then(|s| s.strip_suffix("*/"))
                        .unwrap_or(raw)
                        .trim()
                        .to_string();
                    nodes.push(Node::Comment(Comment { text, span }));
                    self.advance();
                }
                TokenKind::AtKeyword => nodes.push(Node::AtRule(self.parse_at_rule())),
                _ => {
                    if let Some(node) = self.parse_rule_or_declaration() {
                        nodes.push(node);
                    }
                }
            }
        }
        nodes
    }

    /// Parses a `{ ... }` block; the current token must be `{`.
    ///
    /// Returns the block nodes and the end offset of the closing brace.
    fn parse_block(&mut self) -> (Vec<Node>, TextSize) {
        let open = self.current().span;
        self.advance();
        let nodes = self.parse_nodes(true);
        if self.current_kind() == TokenKind::RBrace {
            let end = self.current().span.end;
            self.advance();
            (nodes, end)
        } else {
            self.error(ParseErrorKind::UnclosedBlock, open);
            (nodes, TextSize::from(self.source.len() as u32))
        }
    }

    fn parse_at_rule(&mut self) -> AtRule {
        let keyword = *self.current();
        let name = SmolStr::new(&keyword.span.text(self.source)[1..]);
        self.advance();

        let end = self.scan_statement_end();
        let params = self.text_between(self.pos, end.index);
        self.pos = end.index;

        match end.kind {
            TokenKind::LBrace => {
                let (nodes, close) = self.parse_block();
                AtRule {
                    name,
                    params,
                    nodes: Some(nodes),
                    span: Span::new(keyword.span.start, close),
                }
            }
            TokenKind::Semicolon => {
                let span = keyword.span.cover(self.current().span);
                self.advance();
                AtRule {
                    name,
                    params,
                    nodes: None,
                    span,
                }
            }
            _ => {
                let span = self.span_between(self.pos, self.pos).cover(keyword.span);
                AtRule {
                    name,
                    params,
                    nodes: None,
                    span,
                }
            }
        }
    }

    fn parse_rule_or_declaration(&mut self) -> Option<Node> {
        let start = self.pos;
        let end = self.scan_statement_end();

        if end.kind == TokenKind::LBrace {
            let selector_span = self.span_between(start, end.index);
            let selector = self.text_between(start, end.index);
            self.pos = end.index;
            let id = RuleId(self.next_rule_id);
            self.next_rule_id += 1;
            let (nodes, close) = self.parse_block();
            return Some(Node::Rule(Rule {
                id,
                selector,
                nodes,
                span: Span::new(selector_span.start, close),
                selector_span,
            }));
        }

        let mut span = self.span_between(start, end.index);
        self.pos = end.index;
        if end.kind == TokenKind::Semicolon {
            self.advance();
        }

        let first = self.tokens[start..end.index]
            .iter()
            .find(|t| !t.kind.is_trivia())
            .copied();
        if let Some(token) = first {
            if token.kind == TokenKind::Error && token.span.text(self.source).starts_with('@') {
                let text = self.text_between(start, end.index);
                self.error(ParseErrorKind::InvalidAtRule { text }, span);
                return None;
            }
        }

        let colon = (start..end.index).find(|&i| self.tokens[i].kind == TokenKind::Colon);
        let Some(colon) = colon else {
            let word = self.text_between(start, end.index);
            if !word.is_empty() {
                self.error(ParseErrorKind::UnknownWord { word }, span);
            }
            return None;
        };

        let prop = self.text_between(start, colon);
        if prop.is_empty() {
            let word = self.text_between(start, end.index);
            self.error(ParseErrorKind::UnknownWord { word }, span);
            return None;
        }
        let raw_value = self.text_between(colon + 1, end.index);
        let (value, important) = split_important(&raw_value);

        // Trim leading trivia out of the span.
        if let Some(token) = first {
            span = Span::new(token.span.start, span.end);
        }

        Some(Node::Decl(Declaration {
            prop: SmolStr::new(prop),
            value,
            important,
            span,
        }))
    }
}

/// Strips a trailing `!important` (case-insensitive, spaces allowed after `!`).
fn split_important(value: &str) -> (String, bool) {
    let lower = value.to_ascii_lowercase();
    if let Some(head) = lower.strip_suffix("important") {
        let head_trimmed = head.trim_end();
        if let Some(rest) = head_trimmed.strip_suffix('!') {
            let keep = rest.trim_end().len();
            return (value[..keep].to_string(), true);
        }
    }
    (value.to_string(), false)
}
