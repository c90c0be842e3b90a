//! Stylesheet AST.
//!
//! The tree is deliberately close to what a CSS post-processor works with:
//! rules keep their selector as text, declarations keep their value as text,
//! and both are re-parsed on demand with [`crate::parse_selector`] and
//! [`crate::parse_value`].

use crate::span::Span;
use smol_str::SmolStr;

/// Identity of a rule within one parsed stylesheet.
///
/// Ids are assigned in source order and survive cloning, so per-rule data
/// collected while processing can be looked up again on a cloned tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuleId(pub u32);

/// A parsed stylesheet.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    /// Top-level nodes.
    pub nodes: Vec<Node>,
    /// The span of the whole source.
    pub span: Span,
}

/// A node in a stylesheet or block.
#[derive(Debug, Clone)]
pub enum Node {
    /// A qualified rule (`selector { ... }`).
    Rule(Rule),
    /// An at-rule (`@name params;` or `@name params { ... }`).
    AtRule(AtRule),
    /// A declaration (`prop: value`).
    Decl(Declaration),
    /// A comment.
    Comment(Comment),
}

impl Node {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        match self {
            Node::Rule(n) => n.span,
            Node::AtRule(n) => n.span,
            Node::Decl(n) => n.span,
            Node::Comment(n) => n.span,
        }
    }

    /// Returns the declaration if this node is one.
    pub fn as_decl(&self) -> Option<&Declaration> {
        match self {
            Node::Decl(decl) => Some(decl),
            _ => None,
        }
    }
}

/// A qualified rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Source-order identity.
    pub id: RuleId,
    /// The selector text, trimmed.
    pub selector: String,
    /// The block contents.
    pub nodes: Vec<Node>,
    /// The span of the entire rule.
    pub span: Span,
    /// The span of the selector.
    pub selector_span: Span,
}

impl Rule {
    /// Iterates over the declarations directly inside this rule.
    pub fn decls(&self) -> impl Iterator<Item = &Declaration> {
        self.nodes.iter().filter_map(Node::as_decl)
    }
}

/// An at-rule.
#[derive(Debug, Clone)]
pub struct AtRule {
    /// The name without the leading `@`.
    pub name: SmolStr,
    /// The prelude text, trimmed.
    pub params: String,
    /// The block, if the at-rule has one.
    pub nodes: Option<Vec<Node>>,
    /// The span of the entire at-rule.
    pub span: Span,
}

/// A declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// The property name.
    pub prop: SmolStr,
    /// The value text without `!important`.
    pub value: String,
    /// Whether the declaration was marked `!important`.
    pub important: bool,
    /// The span of the entire declaration.
    pub span: Span,
}

impl Declaration {
    /// Creates a declaration that did not come from source text.
    pub fn synthetic(prop: impl Into<SmolStr>, value: impl Into<String>, span: Span) -> Self {
        Self {
            prop: prop.into(),
            value: value.into(),
            important: false,
            span,
        }
    }
}

/// A comment.
#[derive(Debug, Clone)]
pub struct Comment {
    /// The comment text without delimiters, trimmed.
    pub text: String,
    /// The span of the comment.
    pub span: Span,
}
