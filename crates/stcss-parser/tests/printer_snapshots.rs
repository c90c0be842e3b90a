use stcss_parser::{parse, parse_selector, parse_value, stringify, stringify_selectors, Node};

fn reprint(source: &str) -> String {
    let result = parse(source);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    stringify(&result.stylesheet)
}

#[test]
fn test_snapshot_single_rule() {
    insta::assert_snapshot!(reprint(".root{color:red}"), @r"
    .root {
        color: red;
    }
    ");
}

#[test]
fn test_snapshot_keyframes() {
    insta::assert_snapshot!(
        reprint("@keyframes slide { from { left: 0 } to { left: 10px } }"),
        @r"
    @keyframes slide {
        from {
            left: 0;
        }
        to {
            left: 10px;
        }
    }
    "
    );
}

#[test]
fn test_selector_reprint_is_stable() {
    for selector in [
        ".root",
        ".root .a > .b",
        "Button::label:hover",
        ":global(.x) .a",
        ".a:not(.b, .c)",
        "ul li + li ~ li",
        ".a[data-x~=\"y\"]",
    ] {
        assert_eq!(stringify_selectors(&parse_selector(selector)), selector);
    }
}

#[test]
fn test_recovers_after_stray_brace() {
    let result = parse("} .a { color: red; }");
    assert_eq!(result.errors.len(), 1);
    assert!(matches!(result.stylesheet.nodes[0], Node::Rule(_)));
}

#[test]
fn test_value_in_declaration() {
    let result = parse(".a { border: 1px solid value(c); }");
    let Node::Rule(rule) = &result.stylesheet.nodes[0] else {
        panic!("expected rule");
    };
    let decl = rule.decls().next().expect("declaration");
    let nodes = parse_value(&decl.value);
    let calls: Vec<&str> = nodes
        .iter()
        .filter_map(|n| n.as_function().map(|(name, _)| name))
        .collect();
    assert_eq!(calls, vec!["value"]);
}
