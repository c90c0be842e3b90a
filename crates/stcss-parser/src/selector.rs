//! Selector parser.
//!
//! Parses a selector list into flat node sequences. Nested pseudo-classes
//! that take selector arguments (`:not`, `:is`, `:global`, ...) carry their
//! arguments as parsed selector lists; every other pseudo-class keeps its
//! argument text raw.

use std::fmt::{self, Write as _};

/// Pseudo-classes whose arguments are selector lists.
const NESTED_PSEUDO_CLASSES: &[&str] = &[
    "not", "is", "matches", "where", "has", "any", "global", "local",
];

/// A node in a compound selector sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorNode {
    /// `.name`
    Class(String),
    /// `name`
    Element(String),
    /// `#name`
    Id(String),
    /// `*`
    Universal,
    /// `[content]`
    Attribute(String),
    /// `:name` or `:name(content)`
    PseudoClass {
        /// The pseudo-class name.
        name: String,
        /// Raw argument text, if the pseudo-class was called.
        content: Option<String>,
    },
    /// `::name`
    PseudoElement(String),
    /// `:name(selector, ...)`
    NestedPseudoClass {
        /// The pseudo-class name.
        name: String,
        /// The argument selectors.
        selectors: Vec<Selector>,
    },
    /// Descendant combinator.
    Spacing,
    /// `>`, `+` or `~`
    Operator(char),
    /// `&`
    Nesting,
    /// Text emitted verbatim.
    Raw(String),
}

impl SelectorNode {
    /// Returns true for the descendant and explicit combinators.
    pub fn is_combinator(&self) -> bool {
        matches!(self, SelectorNode::Spacing | SelectorNode::Operator(_))
    }
}

impl fmt::Display for SelectorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorNode::Class(name) => write!(f, ".{name}"),
            SelectorNode::Element(name) => f.write_str(name),
            SelectorNode::Id(name) => write!(f, "#{name}"),
            SelectorNode::Universal => f.write_char('*'),
            SelectorNode::Attribute(content) => write!(f, "[{content}]"),
            SelectorNode::PseudoClass { name, content } => match content {
                Some(content) => write!(f, ":{name}({content})"),
                None => write!(f, ":{name}"),
            },
            SelectorNode::PseudoElement(name) => write!(f, "::{name}"),
            SelectorNode::NestedPseudoClass { name, selectors } => {
                write!(f, ":{name}({})", stringify_selectors(selectors))
            }
            SelectorNode::Spacing => f.write_char(' '),
            SelectorNode::Operator(op) => write!(f, " {op} "),
            SelectorNode::Nesting => f.write_char('&'),
            SelectorNode::Raw(text) => f.write_str(text),
        }
    }
}

/// One complex selector: compounds joined by combinators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    /// The nodes in source order.
    pub nodes: Vec<SelectorNode>,
}

impl Selector {
    /// Creates a selector from nodes.
    pub fn new(nodes: Vec<SelectorNode>) -> Self {
        Self { nodes }
    }

    /// Returns the class name if this selector is exactly one class.
    pub fn as_simple_class(&self) -> Option<&str> {
        match self.nodes.as_slice() {
            [SelectorNode::Class(name)] => Some(name),
            _ => None,
        }
    }

    /// Returns the element name if this selector is exactly one element.
    pub fn as_simple_element(&self) -> Option<&str> {
        match self.nodes.as_slice() {
            [SelectorNode::Element(name)] => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{node}")?;
        }
        Ok(())
    }
}

/// Parses a comma-separated selector list.
pub fn parse_selector(input: &str) -> Vec<Selector> {
    let mut parser = SelectorParser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.parse_list()
}

/// Prints a selector list joined by `", "`.
pub fn stringify_selectors(selectors: &[Selector]) -> String {
    let mut out = String::new();
    for (i, selector) in selectors.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{selector}");
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

struct SelectorParser {
    chars: Vec<char>,
    pos: usize,
}

impl SelectorParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn parse_list(&mut self) -> Vec<Selector> {
        let mut selectors = Vec::new();
        let mut current = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                ',' => {
                    self.pos += 1;
                    selectors.push(finish(std::mem::take(&mut current)));
                }
                c if c.is_whitespace() => {
                    while self.peek().is_some_and(char::is_whitespace) {
                        self.pos += 1;
                    }
                    if !current.is_empty() && !matches!(self.peek(), None | Some(',')) {
                        push_combinator(&mut current, SelectorNode::Spacing);
                    }
                }
                '>' | '+' | '~' => {
                    self.pos += 1;
                    push_combinator(&mut current, SelectorNode::Operator(c));
                    while self.peek().is_some_and(char::is_whitespace) {
                        self.pos += 1;
                    }
                }
                '.' => {
                    self.pos += 1;
                    current.push(SelectorNode::Class(self.read_ident()));
                }
                '#' => {
                    self.pos += 1;
                    current.push(SelectorNode::Id(self.read_ident()));
                }
                '*' => {
                    self.pos += 1;
                    current.push(SelectorNode::Universal);
                }
                '&' => {
                    self.pos += 1;
                    current.push(SelectorNode::Nesting);
                }
                '[' => {
                    self.pos += 1;
                    current.push(SelectorNode::Attribute(self.read_until(']')));
                }
                ':' if self.peek_at(1) == Some(':') => {
                    self.pos += 2;
                    current.push(SelectorNode::PseudoElement(self.read_ident()));
                }
                ':' => {
                    self.pos += 1;
                    let name = self.read_ident();
                    if self.peek() == Some('(') {
                        self.pos += 1;
                        let content = self.read_until(')');
                        if NESTED_PSEUDO_CLASSES.contains(&name.to_ascii_lowercase().as_str()) {
                            current.push(SelectorNode::NestedPseudoClass {
                                name,
                                selectors: parse_selector(&content),
                            });
                        } else {
                            current.push(SelectorNode::PseudoClass {
                                name,
                                content: Some(content),
                            });
                        }
                    } else {
                        current.push(SelectorNode::PseudoClass {
                            name,
                            content: None,
                        });
                    }
                }
                c if is_ident_char(c) || c == '\\' => {
                    current.push(SelectorNode::Element(self.read_ident()));
                }
                _ => {
                    self.pos += 1;
                    match current.last_mut() {
                        Some(SelectorNode::Raw(text)) => text.push(c),
                        _ => current.push(SelectorNode::Raw(c.to_string())),
                    }
                }
            }
        }
        if !current.is_empty() || !selectors.is_empty() {
            selectors.push(finish(current));
        }
        selectors
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                ident.push(c);
                self.pos += 1;
                if let Some(next) = self.peek() {
                    ident.push(next);
                    self.pos += 1;
                }
            } else if is_ident_char(c) {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        ident
    }

    /// Reads balanced text up to the closing delimiter and consumes it.
    fn read_until(&mut self, close: char) -> String {
        let open = if close == ')' { '(' } else { '[' };
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if let Some(q) = quote {
                text.push(c);
                if c == '\\' {
                    if let Some(next) = self.peek() {
                        text.push(next);
                        self.pos += 1;
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                c if c == open => depth += 1,
                c if c == close => {
                    if depth == 0 {
                        return text;
                    }
                    depth -= 1;
                }
                _ => {}
            }
            text.push(c);
        }
        text
    }
}

fn push_combinator(nodes: &mut Vec<SelectorNode>, combinator: SelectorNode) {
    if let Some(last) = nodes.last() {
        if last.is_combinator() {
            if matches!(combinator, SelectorNode::Spacing) {
                return;
            }
            nodes.pop();
        }
    }
    nodes.push(combinator);
}

fn finish(mut nodes: Vec<SelectorNode>) -> Selector {
    while matches!(nodes.last(), Some(SelectorNode::Spacing)) {
        nodes.pop();
    }
    Selector { nodes }
}
