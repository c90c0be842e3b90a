//! Prints a stylesheet AST back to CSS text.

use crate::ast::{Declaration, Node, Stylesheet};

const INDENT: &str = "    ";

/// Prints a stylesheet with one node per line and four-space indentation.
pub fn stringify(stylesheet: &Stylesheet) -> String {
    let mut out = String::new();
    print_nodes(&stylesheet.nodes, 0, &mut out);
    out
}

/// Prints a single declaration without indentation or trailing semicolon.
pub fn stringify_decl(decl: &Declaration) -> String {
    if decl.important {
        format!("{}: {} !important", decl.prop, decl.value)
    } else {
        format!("{}: {}", decl.prop, decl.value)
    }
}

fn print_nodes(nodes: &[Node], depth: usize, out: &mut String) {
    for node in nodes {
        print_node(node, depth, out);
    }
}

fn print_node(node: &Node, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    match node {
        Node::Rule(rule) => {
            out.push_str(&indent);
            out.push_str(&rule.selector);
            print_block(&rule.nodes, depth, out);
        }
        Node::AtRule(at) => {
            out.push_str(&indent);
            out.push('@');
            out.push_str(&at.name);
            if !at.params.is_empty() {
                out.push(' ');
                out.push_str(&at.params);
            }
            match &at.nodes {
                Some(nodes) => print_block(nodes, depth, out),
                None => out.push_str(";\n"),
            }
        }
        Node::Decl(decl) => {
            out.push_str(&indent);
            out.push_str(&stringify_decl(decl));
            out.push_str(";\n");
        }
        Node::Comment(comment) => {
            out.push_str(&indent);
            out.push_str("/* ");
            out.push_str(&comment.text);
            out.push_str(" */\n");
        }
    }
}

fn print_block(nodes: &[Node], depth: usize, out: &mut String) {
    if nodes.is_empty() {
        out.push_str(" {}\n");
        return;
    }
    out.push_str(" {\n");
    print_nodes(nodes, depth + 1, out);
    out.push_str(&INDENT.repeat(depth));
    out.push_str("}\n");
}

#[cfg(test)]
mod tests {
    use crate::{parse, stringify};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_print_nested() {
        let result = parse(
            "/* head */ .a{color:red;margin : 0 !important} @media (max-width: 10px){.b{}} @charset \"utf-8\";",
        );
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(
            stringify(&result.stylesheet),
            "/* head */\n.a {\n    color: red;\n    margin: 0 !important;\n}\n@media (max-width: 10px) {\n    .b {}\n}\n@charset \"utf-8\";\n"
        );
    }
}
