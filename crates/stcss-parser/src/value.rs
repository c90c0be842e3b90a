//! Declaration value parser.
//!
//! Values are split into words, strings, function calls, dividers (`,` and
//! `/`), spaces and comments. Function arguments are nested node lists, which
//! is what `value()`, formatter calls and custom value constructors operate on.

use std::fmt::{self, Write as _};

/// A node in a parsed declaration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueNode {
    /// A bare word (`red`, `10px`, `#fff`, `a\.b`).
    Word(String),
    /// A quoted string; `value` is the raw text between the quotes.
    String {
        /// The quote character.
        quote: char,
        /// The raw contents.
        value: String,
    },
    /// A function call; `name` is empty for a bare parenthesised group.
    Function {
        /// The function name.
        name: String,
        /// The argument nodes.
        nodes: Vec<ValueNode>,
    },
    /// A `,` or `/` divider with the whitespace around it.
    Div {
        /// The divider character.
        value: char,
        /// Whitespace before the divider.
        before: String,
        /// Whitespace after the divider.
        after: String,
    },
    /// A run of whitespace.
    Space(String),
    /// A comment, without delimiters.
    Comment(String),
}

impl ValueNode {
    /// Creates a word node.
    pub fn word(value: impl Into<String>) -> Self {
        ValueNode::Word(value.into())
    }

    /// Returns true for spaces and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(self, ValueNode::Space(_) | ValueNode::Comment(_))
    }

    /// Returns true for a `,` divider.
    pub fn is_comma(&self) -> bool {
        matches!(self, ValueNode::Div { value: ',', .. })
    }

    /// Returns the function name and arguments if this node is a call.
    pub fn as_function(&self) -> Option<(&str, &[ValueNode])> {
        match self {
            ValueNode::Function { name, nodes } if !name.is_empty() => {
                Some((name.as_str(), nodes.as_slice()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueNode::Word(word) => f.write_str(word),
            ValueNode::String { quote, value } => {
                f.write_char(*quote)?;
                f.write_str(value)?;
                f.write_char(*quote)
            }
            ValueNode::Function { name, nodes } => {
                f.write_str(name)?;
                f.write_char('(')?;
                for node in nodes {
                    write!(f, "{node}")?;
                }
                f.write_char(')')
            }
            ValueNode::Div {
                value,
                before,
                after,
            } => {
                f.write_str(before)?;
                f.write_char(*value)?;
                f.write_str(after)
            }
            ValueNode::Space(space) => f.write_str(space),
            ValueNode::Comment(text) => write!(f, "/*{text}*/"),
        }
    }
}

/// Parses a declaration value.
pub fn parse_value(input: &str) -> Vec<ValueNode> {
    let mut parser = ValueParser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.parse_nodes(false)
}

/// Prints value nodes back to text.
pub fn stringify_value(nodes: &[ValueNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        let _ = write!(out, "{node}");
    }
    out
}

/// Splits call arguments on top-level commas.
pub fn split_args(nodes: &[ValueNode]) -> Vec<Vec<ValueNode>> {
    let mut args = vec![Vec::new()];
    for node in nodes {
        if node.is_comma() {
            args.push(Vec::new());
        } else if let Some(last) = args.last_mut() {
            last.push(node.clone());
        }
    }
    if args.len() == 1 && args[0].iter().all(ValueNode::is_trivia) {
        return Vec::new();
    }
    args
}

/// Removes leading and trailing spaces and comments.
pub fn trim_nodes(nodes: &[ValueNode]) -> &[ValueNode] {
    let start = nodes
        .iter()
        .position(|n| !n.is_trivia())
        .unwrap_or(nodes.len());
    let end = nodes
        .iter()
        .rposition(|n| !n.is_trivia())
        .map_or(start, |i| i + 1);
    &nodes[start..end]
}

struct ValueParser {
    chars: Vec<char>,
    pos: usize,
}

impl ValueParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn parse_nodes(&mut self, in_function: bool) -> Vec<ValueNode> {
        let mut nodes = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                ')' if in_function => {
                    self.pos += 1;
                    return nodes;
                }
                ')' => {
                    self.pos += 1;
                    nodes.push(ValueNode::word(")"));
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.pos += 2;
                    let start = self.pos;
                    while self.pos < self.chars.len()
                        && !(self.chars[self.pos] == '*' && self.peek_at(1) == Some('/'))
                    {
                        self.pos += 1;
                    }
                    let text: String = self.chars[start..self.pos].iter().collect();
                    self.pos = (self.pos + 2).min(self.chars.len());
                    nodes.push(ValueNode::Comment(text));
                }
                ',' | '/' => {
                    self.pos += 1;
                    let before = match nodes.last() {
                        Some(ValueNode::Space(_)) => match nodes.pop() {
                            Some(ValueNode::Space(space)) => space,
                            _ => String::new(),
                        },
                        _ => String::new(),
                    };
                    let after = self.take_while(char::is_whitespace);
                    nodes.push(ValueNode::Div {
                        value: c,
                        before,
                        after,
                    });
                }
                c if c.is_whitespace() => {
                    let space = self.take_while(char::is_whitespace);
                    nodes.push(ValueNode::Space(space));
                }
                '"' | '\'' => nodes.push(self.parse_string(c)),
                '(' => {
                    self.pos += 1;
                    let inner = self.parse_nodes(true);
                    nodes.push(ValueNode::Function {
                        name: String::new(),
                        nodes: inner,
                    });
                }
                _ => {
                    let word = self.read_word();
                    if self.peek() == Some('(') {
                        self.pos += 1;
                        let inner = if word.eq_ignore_ascii_case("url")
                            && !matches!(self.peek_raw_start(), Some('"' | '\''))
                        {
                            self.read_raw_url()
                        } else {
                            self.parse_nodes(true)
                        };
                        nodes.push(ValueNode::Function {
                            name: word,
                            nodes: inner,
                        });
                    } else {
                        nodes.push(ValueNode::Word(word));
                    }
                }
            }
        }
        nodes
    }

    fn parse_string(&mut self, quote: char) -> ValueNode {
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\\' {
                value.push(c);
                if let Some(next) = self.peek() {
                    value.push(next);
                    self.pos += 1;
                }
                continue;
            }
            if c == quote {
                break;
            }
            value.push(c);
        }
        ValueNode::String { quote, value }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                word.push(c);
                self.pos += 1;
                if let Some(next) = self.peek() {
                    word.push(next);
                    self.pos += 1;
                }
                continue;
            }
            if c.is_whitespace() || matches!(c, ',' | '/' | '(' | ')' | '"' | '\'') {
                break;
            }
            word.push(c);
            self.pos += 1;
        }
        word
    }

    /// First non-whitespace character at the current position.
    fn peek_raw_start(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    fn read_raw_url(&mut self) -> Vec<ValueNode> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ')') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some(')') {
            self.pos += 1;
        }
        let raw = raw.trim();
        if raw.is_empty() {
            Vec::new()
        } else {
            vec![ValueNode::word(raw)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_value_call() {
        let nodes = parse_value("value(color, 1)");
        assert_eq!(
            nodes,
            vec![ValueNode::Function {
                name: "value".to_string(),
                nodes: vec![
                    ValueNode::word("color"),
                    ValueNode::Div {
                        value: ',',
                        before: String::new(),
                        after: " ".to_string(),
                    },
                    ValueNode::word("1"),
                ],
            }]
        );
    }

    #[test]
    fn test_round_trip_preserves_text() {
        for input in [
            "1px solid value(border)",
            "st-map(a 1, b st-array(x, y))",
            "url(./a.png) no-repeat",
            "\"quoted, text\" / 2",
            "calc(100% - (2 * value(gap)))",
        ] {
            assert_eq!(stringify_value(&parse_value(input)), input);
        }
    }

    #[test]
    fn test_split_args() {
        let nodes = parse_value("a b, c ,d");
        let args = split_args(&nodes);
        assert_eq!(args.len(), 3);
        assert_eq!(stringify_value(trim_nodes(&args[0])), "a b");
        assert_eq!(stringify_value(trim_nodes(&args[1])), "c");
        assert_eq!(stringify_value(trim_nodes(&args[2])), "d");
        assert!(split_args(&parse_value("  ")).is_empty());
    }

    #[test]
    fn test_url_contents_are_raw() {
        let nodes = parse_value("url(a/b,c.png)");
        assert_eq!(
            nodes,
            vec![ValueNode::Function {
                name: "url".to_string(),
                nodes: vec![ValueNode::word("a/b,c.png")],
            }]
        );
    }

    #[test]
    fn test_escaped_word() {
        assert_eq!(parse_value(r"color\.1"), vec![ValueNode::word(r"color\.1")]);
    }
}
