//! Stylesheet parser for the stcss compiler.
//!
//! This crate provides:
//! - Lexer (tokenizer) using `logos`
//! - Recursive descent stylesheet parser with error recovery
//! - Selector and declaration value parsers
//! - A printer that turns the AST back into CSS text
//!
//! # Example
//!
//! ```
//! use stcss_parser::{parse, parse_selector, Node};
//!
//! let result = parse(".root { color: red; }");
//! assert!(result.errors.is_empty());
//!
//! let Node::Rule(rule) = &result.stylesheet.nodes[0] else { unreachable!() };
//! let selectors = parse_selector(&rule.selector);
//! assert_eq!(selectors[0].as_simple_class(), Some("root"));
//! ```

mod ast;
mod error;
mod lexer;
mod parser;
mod printer;
mod selector;
mod span;
mod value;

pub use ast::*;
pub use error::{ParseError, ParseErrorKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use printer::{stringify, stringify_decl};
pub use selector::{parse_selector, stringify_selectors, Selector, SelectorNode};
pub use span::{ByteOffset, LineCol, LineIndex, Span};
pub use value::{parse_value, split_args, stringify_value, trim_nodes, ValueNode};

/// The result of parsing a stylesheet.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed stylesheet.
    pub stylesheet: Stylesheet,
    /// Any errors encountered during parsing.
    pub errors: Vec<ParseError>,
}

/// Parses stylesheet source text into an AST.
///
/// Parsing always produces a stylesheet; malformed input is recovered from
/// and reported in [`ParseResult::errors`].
pub fn parse(source: &str) -> ParseResult {
    parser::Parser::new(source).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let result = parse("");
        assert!(result.errors.is_empty());
        assert!(result.stylesheet.nodes.is_empty());
    }

    #[test]
    fn test_parse_import_block() {
        let result = parse(
            r#":import {
                -st-from: "./button.st.css";
                -st-default: Button;
                -st-named: icon, label as text;
            }"#,
        );
        assert!(result.errors.is_empty());
        let Node::Rule(rule) = &result.stylesheet.nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selector, ":import");
        let props: Vec<&str> = rule.decls().map(|d| d.prop.as_str()).collect();
        assert_eq!(props, vec!["-st-from", "-st-default", "-st-named"]);
        assert_eq!(
            rule.decls().last().map(|d| d.value.as_str()),
            Some("icon, label as text")
        );
    }
}
