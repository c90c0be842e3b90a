//! End-to-end compilation over an in-memory file system.

use camino::Utf8Path;
use pretty_assertions::assert_eq;
use smol_str::SmolStr;
use std::rc::Rc;
use stcss_compiler::{
    ExportValue, JsValue, MemoryFileSystem, ProcessOptions, Stylable, TransformOptions,
    TransformResult,
};
use stcss_diagnostics::DiagnosticCode;

/// Namespaces are the file stem so scoped names are predictable.
fn stylable(files: &[(&str, &str)]) -> Stylable<MemoryFileSystem> {
    let options = ProcessOptions {
        namespace_resolver: Some(Rc::new(|explicit: Option<&str>, path: &Utf8Path| {
            match explicit {
                Some(namespace) => SmolStr::new(namespace),
                None => SmolStr::new(
                    path.file_name()
                        .unwrap_or_default()
                        .trim_end_matches(".st.css"),
                ),
            }
        })),
    };
    Stylable::new(
        MemoryFileSystem::with_files(files.iter().copied()),
        options,
        TransformOptions::default(),
    )
}

fn compile(files: &[(&str, &str)]) -> TransformResult {
    stylable(files)
        .transform_file("/entry.st.css")
        .expect("entry stylesheet")
}

fn codes(result: &TransformResult) -> Vec<DiagnosticCode> {
    result.diagnostics.iter().map(|d| d.code).collect()
}

#[test]
fn test_simple_var() {
    let result = compile(&[(
        "/entry.st.css",
        ":vars { varA: a-val; } .root { prop: value(varA); }",
    )]);
    assert_eq!(result.exports.get_str("varA"), Some("a-val"));
    assert_eq!(result.exports.get_str("root"), Some("entry__root"));
    insta::assert_snapshot!(result.css, @r"
    .entry__root {
        prop: a-val;
    }
    ");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn test_cyclic_vars_terminate() {
    let result = compile(&[(
        "/entry.st.css",
        ":vars { varA: a(value(varB)); varB: b(value(varA)); }",
    )]);
    assert_eq!(result.exports.get_str("varA"), Some("a(b(a(value(varB))))"));
    assert_eq!(result.exports.get_str("varB"), Some("b(a(b(value(varA))))"));
    let cyclic = result
        .diagnostics
        .iter()
        .filter(|d| d.code == DiagnosticCode::CyclicValue)
        .count();
    assert_eq!(cyclic, 2);
}

#[test]
fn test_nested_custom_value_path() {
    let result = compile(&[(
        "/entry.st.css",
        ":vars { deep: st-array(st-map(idx st-array(a, b))); } .root { prop: value(deep, 0, idx, 1); }",
    )]);
    assert!(result.css.contains("prop: b;"), "{}", result.css);
    let mut inner = indexmap::IndexMap::new();
    inner.insert(
        "idx".to_string(),
        ExportValue::List(vec!["a".into(), "b".into()]),
    );
    assert_eq!(
        result.exports.get("deep"),
        Some(&ExportValue::List(vec![ExportValue::Map(inner)]))
    );
}

#[test]
fn test_state_inherited_across_import() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; }
            .local { -st-extends: Comp; }
            .local:my-state { color: red; }"#,
        ),
        ("/comp.st.css", ".root { -st-states: my-state; }"),
    ]);
    assert!(
        result
            .css
            .contains(".entry__root .entry__local.comp__root[data-comp-my-state] {"),
        "{}",
        result.css
    );
    assert!(!result.css.contains("data-entry-my-state"));
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn test_unknown_state_is_kept() {
    let result = compile(&[("/entry.st.css", ".root:unknownState {}")]);
    assert_eq!(codes(&result), vec![DiagnosticCode::UnknownStateUsage]);
    assert_eq!(result.css, ".entry__root:unknownState {}\n");
}

#[test]
fn test_typed_state_output() {
    let result = compile(&[(
        "/entry.st.css",
        ".root { -st-states: size(enum(small, big)), cls(tag); }
        .root:size(big):cls(wide) {}
        .root:size(huge) {}",
    )]);
    assert!(
        result
            .css
            .contains(r#".entry__root[data-entry-size="big"][data-entry-cls~="wide"] {}"#),
        "{}",
        result.css
    );
    assert_eq!(codes(&result), vec![DiagnosticCode::StateValidationFailed]);
}

#[test]
fn test_st_array_computed_and_flat() {
    let stylable = stylable(&[("/entry.st.css", ":vars { name: st-array(a, b); }")]);
    let computed = stylable.computed("/entry.st.css").expect("computed vars");
    assert_eq!(
        computed["name"].value,
        ExportValue::List(vec!["a".into(), "b".into()])
    );
    let flat: Vec<(Vec<String>, String)> = stylable
        .flat_vars("/entry.st.css")
        .expect("flat vars")
        .into_iter()
        .map(|f| (f.path, f.value))
        .collect();
    assert_eq!(
        flat,
        vec![
            (vec!["name".to_string(), "0".to_string()], "a".to_string()),
            (vec!["name".to_string(), "1".to_string()], "b".to_string()),
        ]
    );
}

#[test]
fn test_exports_cover_local_symbols_only() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; -st-named: accent, part; }
            :vars { size: 1px; }
            .a { -st-extends: Comp; }
            @keyframes fade { from { opacity: 0; } }"#,
        ),
        ("/comp.st.css", ":vars { accent: gold; } .part {}"),
    ]);
    let keys: Vec<&str> = result.exports.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["root", "a", "size", "fade"]);
    assert_eq!(result.exports.get_str("a"), Some("entry__a"));
    assert_eq!(result.exports.get_str("fade"), Some("entry__fade"));
}

#[test]
fn test_compose_and_global_exports() {
    let result = compile(&[(
        "/entry.st.css",
        r#".base {} .btn { -st-compose: base; } .ext { -st-extends: btn; } .g { -st-global: ".outside"; }
        .g .btn {}"#,
    )]);
    assert_eq!(result.exports.get_str("btn"), Some("entry__btn entry__base"));
    assert_eq!(result.exports.get_str("ext"), Some("entry__ext entry__btn"));
    assert_eq!(result.exports.get_str("g"), Some("outside"));
    assert!(result.css.contains(".outside .entry__btn {}"), "{}", result.css);
}

#[test]
fn test_st_import_matches_import_block() {
    let comp = ("/comp.st.css", ":vars { accent: gold; } .part {}");
    let block = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; -st-named: part, accent; }
            .root { -st-extends: Comp; }
            .part { color: value(accent); }"#,
        ),
        comp,
    ]);
    let at_rule = compile(&[
        (
            "/entry.st.css",
            r#"@st-import Comp, [part, accent] from "./comp.st.css";
            .root { -st-extends: Comp; }
            .part { color: value(accent); }"#,
        ),
        comp,
    ]);
    assert_eq!(block.css, at_rule.css);
    assert_eq!(block.exports, at_rule.exports);
    assert!(block.css.contains(".entry__root .comp__part {"), "{}", block.css);
    assert!(block.css.contains("color: gold;"));
    assert_eq!(block.exports.get_str("part"), Some("comp__part"));
}

#[test]
fn test_formatter_failure_keeps_call() {
    let stylable = stylable(&[(
        "/entry.st.css",
        r#":import { -st-from: "./fmt.js"; -st-named: broken; }
        :vars { size: 2px; }
        .root { width: broken(value(size)); }"#,
    )]);
    stylable.register_module(
        "/fmt.js",
        JsValue::object([("broken", JsValue::function(|_| Err("boom".to_string())))]),
    );
    let result = stylable.transform_file("/entry.st.css").expect("entry");
    assert!(result.css.contains("width: broken(2px);"), "{}", result.css);
    assert_eq!(codes(&result), vec![DiagnosticCode::FailedToExecuteFormatter]);
    assert_eq!(
        result.diagnostics[0].message,
        "failed to execute formatter \"broken\" with args: \"2px\": boom"
    );
}

#[test]
fn test_js_and_css_mixins_merge_in_order() {
    let stylable = stylable(&[(
        "/entry.st.css",
        r#":import { -st-from: "./mix.js"; -st-named: shadow; }
        .base { color: red; }
        .base:hover { color: blue; }
        .btn { margin: 0; -st-mixin: shadow(1px), base; padding: 0; }"#,
    )]);
    stylable.register_module(
        "/mix.js",
        JsValue::object([(
            "shadow",
            JsValue::function(|args| {
                Ok(JsValue::object([
                    ("box-shadow", JsValue::from(args[0].as_str())),
                    ("&:hover", JsValue::object([("opacity", JsValue::from("0.5"))])),
                ]))
            }),
        )]),
    );
    let result = stylable.transform_file("/entry.st.css").expect("entry");
    insta::assert_snapshot!(result.css, @r"
    .entry__root .entry__base {
        color: red;
    }
    .entry__root .entry__base:hover {
        color: blue;
    }
    .entry__root .entry__btn {
        margin: 0;
        box-shadow: 1px;
        color: red;
        padding: 0;
    }
    .entry__root .entry__btn:hover {
        opacity: 0.5;
    }
    .entry__root .entry__btn:hover {
        color: blue;
    }
    ");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
}

#[test]
fn test_mixin_failures_omit_only_that_mixin() {
    let stylable = stylable(&[(
        "/entry.st.css",
        r#":import { -st-from: "./mix.js"; -st-named: boom, text; }
        .loop { -st-mixin: loop; }
        .btn { -st-mixin: boom, text, nope, root; color: red; }"#,
    )]);
    stylable.register_module(
        "/mix.js",
        JsValue::object([
            ("boom", JsValue::function(|_| Err("exploded".to_string()))),
            ("text", JsValue::from("plain")),
        ]),
    );
    let result = stylable.transform_file("/entry.st.css").expect("entry");
    assert_eq!(
        codes(&result),
        vec![
            DiagnosticCode::CyclicMixin,
            DiagnosticCode::FailedToApplyMixin,
            DiagnosticCode::FailedToApplyMixin,
            DiagnosticCode::UnknownMixin,
            DiagnosticCode::CannotMixinRoot,
        ]
    );
    assert!(
        result.css.contains(".entry__root .entry__btn {\n    color: red;\n}"),
        "{}",
        result.css
    );
}

#[test]
fn test_css_mixin_options_override_vars() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./lib.st.css"; -st-named: box; }
            .btn { -st-mixin: box(size 4px); }"#,
        ),
        (
            "/lib.st.css",
            ":vars { size: 1px; } .box { padding: value(size); } .box .inner { margin: value(size); }",
        ),
    ]);
    insta::assert_snapshot!(result.css, @r"
    .entry__root .entry__btn {
        padding: 4px;
    }
    .entry__root .entry__btn .lib__inner {
        margin: 4px;
    }
    ");
}

#[test]
fn test_custom_selector_fans_out() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; }
            .root { -st-extends: Comp; }
            .root::parts { color: red; }"#,
        ),
        (
            "/comp.st.css",
            "@custom-selector :--parts .icon, .label; .icon {} .label {}",
        ),
    ]);
    assert!(
        result.css.contains(
            ".entry__root.comp__root .comp__icon, .entry__root.comp__root .comp__label {"
        ),
        "{}",
        result.css
    );
}

#[test]
fn test_local_custom_selector_and_pseudo_element() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; }
            @custom-selector :--heading h1, h2;
            .title { -st-extends: Comp; }
            .title::icon, :--heading {}
            .title::missing {}"#,
        ),
        ("/comp.st.css", ".icon {}"),
    ]);
    assert!(
        result.css.contains(
            ".entry__root .entry__title.comp__root .comp__icon, .entry__root h1, .entry__root h2 {}"
        ),
        "{}",
        result.css
    );
    assert!(codes(&result).contains(&DiagnosticCode::UnknownPseudoElement));
}

#[test]
fn test_theme_overrides_apply() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./theme.st.css"; -st-theme: true; -st-named: accent; accent: gold; }
            .root { color: value(accent); }"#,
        ),
        ("/theme.st.css", ":vars { accent: purple; } .root {}"),
    ]);
    assert!(result.css.contains("color: gold;"), "{}", result.css);
    assert_eq!(
        result.exports.get_str("root"),
        Some("entry__root theme__root")
    );
}

#[test]
fn test_global_selector_is_not_prefixed() {
    let result = compile(&[(
        "/entry.st.css",
        ".a :global(.x, .y) .b {} :global(body) .a {}",
    )]);
    insta::assert_snapshot!(result.css, @r"
    .entry__root .entry__a .x .entry__b, .entry__root .entry__a .y .entry__b {}
    body .entry__a {}
    ");
}

#[test]
fn test_component_element_and_keyframes() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./button.st.css"; -st-default: Button; }
            Button:pressed { animation: spin 1s; }
            @keyframes spin { to { opacity: 1; } }"#,
        ),
        ("/button.st.css", ".root { -st-states: pressed; }"),
    ]);
    assert!(
        result
            .css
            .contains(".entry__root .button__root[data-button-pressed] {\n    animation: entry__spin 1s;"),
        "{}",
        result.css
    );
    assert!(result.css.contains("@keyframes entry__spin {"));
}

#[test]
fn test_export_name_collision() {
    let result = compile(&[(
        "/entry.st.css",
        ":vars { spin: red; } @keyframes spin { from { opacity: 0; } } .a {} @keyframes a { to {} }",
    )]);
    assert_eq!(result.exports.get_str("spin"), Some("red"));
    assert_eq!(result.exports.get_str("a"), Some("entry__a"));
    assert_eq!(codes(&result), vec![DiagnosticCode::ExportNameCollision]);
    assert_eq!(result.diagnostics[0].word.as_deref(), Some("spin"));
}

#[test]
fn test_cannot_compose_root() {
    let result = compile(&[
        (
            "/entry.st.css",
            r#":import { -st-from: "./comp.st.css"; -st-default: Comp; }
            .x { -st-compose: Comp; }
            .y { -st-compose: root; }"#,
        ),
        ("/comp.st.css", ".root {}"),
    ]);
    assert_eq!(result.exports.get_str("x"), Some("entry__x"));
    assert_eq!(result.exports.get_str("y"), Some("entry__y"));
    assert_eq!(
        codes(&result),
        vec![
            DiagnosticCode::CannotComposeRoot,
            DiagnosticCode::CannotComposeRoot
        ]
    );
}

#[test]
fn test_global_class_fans_out() {
    let result = compile(&[(
        "/entry.st.css",
        r#".g { -st-global: ".one, .two"; } .g .x {}"#,
    )]);
    assert!(result.css.contains(".one .entry__x"), "{}", result.css);
    assert!(result.css.contains(".two .entry__x"), "{}", result.css);
}
