//! Evaluation of declaration values.
//!
//! `value(name, path...)` is replaced by the evaluated variable, calls to
//! custom value types build [`CustomBox`]es, and calls to imported functions
//! run as formatters. Evaluation never fails: problems are reported and the
//! offending text is left in place.

use crate::custom_values::{
    build_box, call_text, ArgResolver, CustomValueExtension, CustomValueRegistry, Evaluated,
};
use crate::js::{JsFunction, JsValue};
use crate::meta::{ImportKind, StylableMeta, Symbol, SymbolId};
use crate::resolver::{Resolved, StylableResolver};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use smol_str::SmolStr;
use stcss_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use stcss_parser::{parse_value, split_args, stringify_value, trim_nodes, Span, ValueNode};
use std::rc::Rc;
use tracing::trace;

/// What a [`ReplaceValueHook`] is rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTarget<'a> {
    /// A `value()` reference to the named variable.
    Var(&'a str),
    /// A formatter call.
    Formatter(&'a str),
}

/// Rewrites substituted values.
///
/// Called with the substituted text, the target, whether the target is
/// defined in the file being transformed, and the path used to reach it.
pub type ReplaceValueHook = Rc<dyn Fn(&str, HookTarget<'_>, bool, &[String]) -> String>;

/// Variable values that replace the declared ones in one file.
#[derive(Debug, Clone, PartialEq)]
pub struct VarOverrides {
    pub source: Utf8PathBuf,
    pub values: IndexMap<SmolStr, String>,
}

/// Where evaluation currently reads from.
#[derive(Clone)]
struct Scope<'o> {
    meta: Rc<StylableMeta>,
    span: Span,
    overrides: &'o [VarOverrides],
}

/// Variables currently being expanded.
#[derive(Debug, Default)]
struct ValueStack {
    entries: Vec<(Utf8PathBuf, SmolStr)>,
    /// Stack depth at which a cycle was reported. Repeats below that
    /// depth are left unexpanded until the stack unwinds past it.
    cyclic_at: Option<usize>,
}

impl ValueStack {
    fn position(&self, source: &Utf8Path, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(s, n)| s == source && n == name)
    }

    fn push(&mut self, source: &Utf8Path, name: &SmolStr) {
        self.entries.push((source.to_path_buf(), name.clone()));
    }

    fn pop(&mut self) {
        self.entries.pop();
        if self.cyclic_at.is_some_and(|depth| self.entries.len() < depth) {
            self.cyclic_at = None;
        }
    }

    fn is_cyclic(&self) -> bool {
        self.cyclic_at.is_some()
    }

    fn trace_from(&self, index: usize) -> Vec<String> {
        self.entries[index..]
            .iter()
            .map(|(source, name)| format!("{source}: {name}"))
            .collect()
    }
}

/// Evaluates values on behalf of one transformation.
pub struct ValueEvaluator<'r> {
    resolver: StylableResolver<'r>,
    registry: &'r CustomValueRegistry,
    origin: Utf8PathBuf,
    hook: Option<ReplaceValueHook>,
    stack: ValueStack,
    diagnostics: Diagnostics,
}

impl<'r> ValueEvaluator<'r> {
    /// Creates an evaluator reporting relative to `origin`.
    pub fn new(
        resolver: StylableResolver<'r>,
        registry: &'r CustomValueRegistry,
        origin: impl Into<Utf8PathBuf>,
        hook: Option<ReplaceValueHook>,
    ) -> Self {
        Self {
            resolver,
            registry,
            origin: origin.into(),
            hook,
            stack: ValueStack::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Takes the collected diagnostics, leaving none behind.
    pub fn take_diagnostics(&mut self) -> Diagnostics {
        std::mem::take(&mut self.diagnostics)
    }

    /// Records a diagnostic. Returns false for a duplicate.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        self.diagnostics.push(diagnostic)
    }

    /// Builds a diagnostic located in `file`.
    pub fn locate(
        &self,
        file: &Utf8Path,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
    ) -> Diagnostic {
        let diagnostic = Diagnostic::new(code, message, span);
        if file == self.origin {
            diagnostic
        } else {
            diagnostic.with_file(file)
        }
    }

    /// Evaluates a declaration value written in `meta`.
    pub fn evaluate(
        &mut self,
        meta: &Rc<StylableMeta>,
        text: &str,
        span: Span,
        overrides: &[VarOverrides],
    ) -> Evaluated {
        if !text.contains('(') {
            return Evaluated::Str(text.to_string());
        }
        let scope = Scope {
            meta: Rc::clone(meta),
            span,
            overrides,
        };
        self.eval_nodes(&scope, &parse_value(text))
    }

    /// Evaluates a variable of `meta` from scratch.
    pub fn evaluate_var(
        &mut self,
        meta: &Rc<StylableMeta>,
        id: SymbolId,
        overrides: &[VarOverrides],
    ) -> Evaluated {
        let Some(var) = meta.symbol(id).as_var() else {
            return Evaluated::Str(String::new());
        };
        let literal = format!("value({})", var.name);
        let scope = Scope {
            meta: Rc::clone(meta),
            span: var.span,
            overrides,
        };
        self.eval_var(&scope, Rc::clone(meta), id, &[], &literal)
    }

    fn report_in(&mut self, scope: &Scope<'_>, code: DiagnosticCode, message: String, word: &str) {
        let diagnostic = self
            .locate(&scope.meta.source, code, message, scope.span)
            .with_word(word);
        self.diagnostics.push(diagnostic);
    }

    fn eval_nodes(&mut self, scope: &Scope<'_>, nodes: &[ValueNode]) -> Evaluated {
        if let [single] = trim_nodes(nodes) {
            if nodes.len() == 1 {
                return self.eval_node(scope, single);
            }
        }
        Evaluated::Str(self.substitute(scope, nodes))
    }

    fn substitute(&mut self, scope: &Scope<'_>, nodes: &[ValueNode]) -> String {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.eval_node(scope, node).flatten());
        }
        out
    }

    fn eval_node(&mut self, scope: &Scope<'_>, node: &ValueNode) -> Evaluated {
        match node {
            ValueNode::Function { name, nodes } if name == "value" => {
                self.eval_value_call(scope, node, nodes)
            }
            ValueNode::Function { name, nodes } if !name.is_empty() => {
                self.eval_call(scope, name, nodes)
            }
            ValueNode::Function { nodes, .. } => {
                Evaluated::Str(format!("({})", self.substitute(scope, nodes)))
            }
            other => Evaluated::Str(other.to_string()),
        }
    }

    fn eval_call(&mut self, scope: &Scope<'_>, name: &str, args: &[ValueNode]) -> Evaluated {
        if let Some(extension) = self.registry.get(name) {
            return self.build_custom(scope, name, extension, args);
        }
        if let Some(id) = scope.meta.get(name) {
            if matches!(scope.meta.symbol(id), Symbol::Import(_)) {
                if let Some(Resolved::Js(js)) = self.resolver.deep_resolve(&scope.meta, id) {
                    match js.value {
                        JsValue::CustomValue(extension) => {
                            return self.build_custom(scope, name, extension, args);
                        }
                        JsValue::Function(function) => {
                            return self.call_formatter(scope, name, &function, args);
                        }
                        other => self.report_in(
                            scope,
                            DiagnosticCode::InvalidFormatter,
                            format!(
                                "cannot use \"{name}\" as a formatter, it is a {}",
                                other.kind_name()
                            ),
                            name,
                        ),
                    }
                }
            }
        }
        Evaluated::Str(format!("{name}({})", self.substitute(scope, args)))
    }

    fn build_custom(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        extension: Rc<dyn CustomValueExtension>,
        args: &[ValueNode],
    ) -> Evaluated {
        let result = {
            let mut resolver = ScopedArgs {
                evaluator: self,
                scope,
            };
            build_box(name, extension, args, &mut resolver)
        };
        match result {
            Ok(custom) => Evaluated::Box(custom),
            Err(error) => {
                self.report_in(
                    scope,
                    DiagnosticCode::CustomValueError,
                    format!("failed to build custom value \"{name}\": {error}"),
                    name,
                );
                Evaluated::Str(call_text(name, args))
            }
        }
    }

    fn call_formatter(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        function: &JsFunction,
        args: &[ValueNode],
    ) -> Evaluated {
        let values: Vec<String> = split_args(args)
            .iter()
            .map(|arg| self.eval_nodes(scope, trim_nodes(arg)).flatten())
            .collect();
        let failure = match function.call(&values) {
            Ok(result) => match result.as_css_string() {
                Some(text) => {
                    trace!(formatter = name, "formatter applied");
                    let is_local = scope.meta.source == self.origin;
                    return Evaluated::Str(self.apply_hook(
                        text,
                        HookTarget::Formatter(name),
                        is_local,
                        &[],
                    ));
                }
                None => format!("returned {}", result.kind_name()),
            },
            Err(message) => message,
        };
        self.report_in(
            scope,
            DiagnosticCode::FailedToExecuteFormatter,
            format!(
                "failed to execute formatter \"{name}\" with args: \"{}\": {failure}",
                values.join(", ")
            ),
            name,
        );
        Evaluated::Str(format!("{name}({})", values.join(", ")))
    }

    fn eval_value_call(
        &mut self,
        scope: &Scope<'_>,
        node: &ValueNode,
        args: &[ValueNode],
    ) -> Evaluated {
        let parts: Vec<String> = split_args(args)
            .iter()
            .map(|arg| {
                let text = stringify_value(trim_nodes(arg));
                crate::directives::strip_quotes(&text).to_string()
            })
            .collect();
        let literal = node.to_string();
        let Some((name, path)) = parts.split_first() else {
            return Evaluated::Str(literal);
        };

        let Some(id) = scope.meta.get(name) else {
            self.report_in(
                scope,
                DiagnosticCode::UnknownVar,
                format!("unknown var \"{name}\""),
                name,
            );
            return Evaluated::Str(literal);
        };

        match scope.meta.symbol(id) {
            Symbol::Var(_) => self.eval_var(scope, Rc::clone(&scope.meta), id, path, &literal),
            Symbol::Import(import) => {
                if let Some(value) = self.theme_override(scope, import.import, &import.kind) {
                    return match self.try_lookup_path(scope, name, path, value) {
                        Some(value) => self.hook_value(value, name, false, path),
                        None => Evaluated::Str(literal),
                    };
                }
                match self.resolver.deep_resolve(&scope.meta, id) {
                    Some(Resolved::Css(css)) => {
                        if matches!(css.symbol(), Symbol::Var(_)) {
                            let symbol = css.symbol;
                            return self.eval_var(scope, css.meta, symbol, path, &literal);
                        }
                        let kind = css.symbol().kind_name();
                        self.report_in(
                            scope,
                            DiagnosticCode::CannotUseAsValue,
                            format!("cannot use {kind} \"{name}\" as a value"),
                            name,
                        );
                        Evaluated::Str(literal)
                    }
                    Some(Resolved::Js(js)) => self.js_value(scope, name, path, &js.value, literal),
                    // Unloadable imports are reported once per import, not per use.
                    None => Evaluated::Str(literal),
                }
            }
            other => {
                let kind = other.kind_name();
                self.report_in(
                    scope,
                    DiagnosticCode::CannotUseAsValue,
                    format!("cannot use {kind} \"{name}\" as a value"),
                    name,
                );
                Evaluated::Str(literal)
            }
        }
    }

    fn theme_override(
        &mut self,
        scope: &Scope<'_>,
        import: usize,
        kind: &ImportKind,
    ) -> Option<Evaluated> {
        let imported = scope.meta.imports.get(import)?;
        if !imported.theme {
            return None;
        }
        let ImportKind::Named { exported } = kind else {
            return None;
        };
        let decl = imported
            .overrides
            .iter()
            .rev()
            .find(|decl| decl.prop == *exported)?;
        let override_scope = Scope {
            meta: Rc::clone(&scope.meta),
            span: decl.span,
            overrides: scope.overrides,
        };
        let value = decl.value.clone();
        Some(self.eval_nodes(&override_scope, &parse_value(&value)))
    }

    fn js_value(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        path: &[String],
        value: &JsValue,
        literal: String,
    ) -> Evaluated {
        let mut current = value;
        for segment in path {
            match current.get(segment) {
                Some(next) => current = next,
                None => {
                    self.report_in(
                        scope,
                        DiagnosticCode::CouldNotResolveValue,
                        format!("cannot resolve value \"{name}, {}\"", path.join(", ")),
                        name,
                    );
                    return Evaluated::Str(literal);
                }
            }
        }
        match current.as_css_string() {
            Some(text) => {
                Evaluated::Str(self.apply_hook(text, HookTarget::Var(name), false, path))
            }
            None => {
                self.report_in(
                    scope,
                    DiagnosticCode::CannotUseAsValue,
                    format!("cannot use {} \"{name}\" as a value", current.kind_name()),
                    name,
                );
                Evaluated::Str(literal)
            }
        }
    }

    /// Expands a variable declared in `meta`.
    fn eval_var(
        &mut self,
        scope: &Scope<'_>,
        meta: Rc<StylableMeta>,
        id: SymbolId,
        path: &[String],
        literal: &str,
    ) -> Evaluated {
        let Some(var) = meta.symbol(id).as_var() else {
            return Evaluated::Str(literal.to_string());
        };
        let name = var.name.clone();

        if let Some(value) = scope
            .overrides
            .iter()
            .filter(|o| o.source == meta.source)
            .find_map(|o| o.values.get(&name))
        {
            let value = Evaluated::Str(value.clone());
            let is_local = meta.source == self.origin;
            return match self.try_lookup_path(scope, &name, path, value) {
                Some(value) => self.hook_value(value, &name, is_local, path),
                None => Evaluated::Str(literal.to_string()),
            };
        }

        if let Some(index) = self.stack.position(&meta.source, &name) {
            if self.stack.is_cyclic() {
                return Evaluated::Str(literal.to_string());
            }
            let mut trace = self.stack.trace_from(index);
            trace.push(format!("{}: {name}", meta.source));
            let diagnostic = self
                .locate(
                    &meta.source,
                    DiagnosticCode::CyclicValue,
                    format!("cyclic value definition detected: \"{name}\""),
                    var.span,
                )
                .with_word(name.as_str())
                .with_trace(trace);
            self.diagnostics.push(diagnostic);
            self.stack.cyclic_at = Some(self.stack.entries.len());
        }

        let text = match &var.value_type {
            Some(value_type) => format!("{value_type}({})", var.text),
            None => var.text.clone(),
        };
        let var_scope = Scope {
            meta: Rc::clone(&meta),
            span: var.span,
            overrides: scope.overrides,
        };
        self.stack.push(&meta.source, &name);
        let value = self.eval_nodes(&var_scope, &parse_value(&text));
        self.stack.pop();

        let is_local = meta.source == self.origin;
        match self.try_lookup_path(scope, &name, path, value) {
            Some(value) => self.hook_value(value, &name, is_local, path),
            None => Evaluated::Str(literal.to_string()),
        }
    }

    /// Runs the replace hook over a successfully substituted value.
    fn hook_value(
        &self,
        value: Evaluated,
        name: &str,
        is_local: bool,
        path: &[String],
    ) -> Evaluated {
        match value {
            Evaluated::Str(text) => {
                Evaluated::Str(self.apply_hook(text, HookTarget::Var(name), is_local, path))
            }
            Evaluated::Box(custom) => match &self.hook {
                Some(_) => {
                    let flat = Evaluated::Box(custom.clone()).flatten();
                    let replaced =
                        self.apply_hook(flat.clone(), HookTarget::Var(name), is_local, path);
                    if replaced == flat {
                        Evaluated::Box(custom)
                    } else {
                        Evaluated::Str(replaced)
                    }
                }
                None => Evaluated::Box(custom),
            },
        }
    }

    /// Follows `path` into a value, reporting and returning None on a miss.
    fn try_lookup_path(
        &mut self,
        scope: &Scope<'_>,
        name: &str,
        path: &[String],
        value: Evaluated,
    ) -> Option<Evaluated> {
        if path.is_empty() {
            return Some(value);
        }
        match value.get_path(path) {
            Ok(found) => Some(found.clone()),
            Err(_) => {
                self.report_in(
                    scope,
                    DiagnosticCode::CouldNotResolveValue,
                    format!("cannot resolve value \"{name}, {}\"", path.join(", ")),
                    name,
                );
                None
            }
        }
    }

    fn apply_hook(
        &self,
        text: String,
        target: HookTarget<'_>,
        is_local: bool,
        path: &[String],
    ) -> String {
        match &self.hook {
            Some(hook) => hook(&text, target, is_local, path),
            None => text,
        }
    }
}

/// Evaluates custom value arguments in the scope of the call.
struct ScopedArgs<'e, 'r, 's, 'o> {
    evaluator: &'e mut ValueEvaluator<'r>,
    scope: &'s Scope<'o>,
}

impl ArgResolver for ScopedArgs<'_, '_, '_, '_> {
    fn resolve_arg(&mut self, nodes: &[ValueNode]) -> Evaluated {
        self.evaluator.eval_nodes(self.scope, nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FileProcessor, MemoryFileSystem, ModuleHost};
    use crate::processor::ProcessOptions;
    use pretty_assertions::assert_eq;

    struct Fixture {
        host: FileProcessor<MemoryFileSystem>,
        registry: CustomValueRegistry,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                host: FileProcessor::new(
                    MemoryFileSystem::with_files(files.iter().copied()),
                    ProcessOptions::default(),
                ),
                registry: CustomValueRegistry::new(),
            }
        }

        fn meta(&self) -> Rc<StylableMeta> {
            self.host
                .process(Utf8Path::new("/entry.st.css"))
                .expect("entry stylesheet")
        }

        fn evaluator(&self) -> ValueEvaluator<'_> {
            ValueEvaluator::new(
                StylableResolver::new(&self.host),
                &self.registry,
                "/entry.st.css",
                None,
            )
        }
    }

    fn var(evaluator: &mut ValueEvaluator<'_>, meta: &Rc<StylableMeta>, name: &str) -> Evaluated {
        let id = meta.get(name).expect("var symbol");
        evaluator.evaluate_var(meta, id, &[])
    }

    fn codes(evaluator: &ValueEvaluator<'_>) -> Vec<DiagnosticCode> {
        evaluator.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_simple_and_nested_vars() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { color: red; border: 1px solid value(color); }",
        )]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        assert_eq!(
            var(&mut evaluator, &meta, "border"),
            Evaluated::Str("1px solid red".into())
        );
        let value = evaluator.evaluate(&meta, "value(color) value(border)", Span::default(), &[]);
        assert_eq!(value.flatten(), "red 1px solid red");
        assert!(evaluator.diagnostics().is_empty());
    }

    #[test]
    fn test_cyclic_vars() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { varA: a(value(varB)); varB: b(value(varA)); }",
        )]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        assert_eq!(var(&mut evaluator, &meta, "varA").flatten(), "a(b(a(value(varB))))");
        assert_eq!(var(&mut evaluator, &meta, "varB").flatten(), "b(a(b(value(varA))))");

        let cycles: Vec<&Diagnostic> = evaluator
            .diagnostics()
            .iter()
            .filter(|d| d.code == DiagnosticCode::CyclicValue)
            .collect();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0].message, "cyclic value definition detected: \"varA\"");
        assert_eq!(
            cycles[0].trace,
            vec![
                "/entry.st.css: varA".to_string(),
                "/entry.st.css: varB".to_string(),
                "/entry.st.css: varA".to_string(),
            ]
        );
    }

    #[test]
    fn test_independent_cycles_in_one_var() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { x: value(a) value(c); a: A(value(b)); b: B(value(a)); c: C(value(d)); d: D(value(c)); }",
        )]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        assert_eq!(
            var(&mut evaluator, &meta, "x").flatten(),
            "A(B(A(value(b)))) C(D(C(value(d))))"
        );
        assert_eq!(var(&mut evaluator, &meta, "c").flatten(), "C(D(C(value(d))))");
    }

    #[test]
    fn test_unknown_and_wrong_kind() {
        let fixture = Fixture::new(&[("/entry.st.css", ".part {}")]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        let value = evaluator.evaluate(&meta, "value(nope) value(part)", Span::default(), &[]);
        assert_eq!(value.flatten(), "value(nope) value(part)");
        assert_eq!(
            codes(&evaluator),
            vec![DiagnosticCode::UnknownVar, DiagnosticCode::CannotUseAsValue]
        );
    }

    #[test]
    fn test_custom_value_path() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { theme: st-map(colors st-map(primary red, secondary blue), sizes st-array(1px, 2px)); }",
        )]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        let value = evaluator.evaluate(
            &meta,
            "value(theme, colors, secondary) value(theme, sizes, 1)",
            Span::default(),
            &[],
        );
        assert_eq!(value.flatten(), "blue 2px");

        let bad = evaluator.evaluate(&meta, "value(theme, nope)", Span::default(), &[]);
        assert_eq!(bad.flatten(), "value(theme, nope)");
        assert_eq!(codes(&evaluator), vec![DiagnosticCode::CouldNotResolveValue]);
        assert_eq!(
            evaluator.diagnostics().iter().next().map(|d| d.message.as_str()),
            Some("cannot resolve value \"theme, nope\"")
        );
    }

    #[test]
    fn test_type_annotation_wraps_value() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { /* @type st-array */ list: a, b; }",
        )]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        let value = evaluator.evaluate(&meta, "value(list, 1)", Span::default(), &[]);
        assert_eq!(value.flatten(), "b");
    }

    #[test]
    fn test_custom_value_error_keeps_text() {
        let fixture = Fixture::new(&[("/entry.st.css", ":vars { m: st-map(a); }")]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        assert_eq!(var(&mut evaluator, &meta, "m").flatten(), "st-map(a)");
        assert_eq!(codes(&evaluator), vec![DiagnosticCode::CustomValueError]);
    }

    #[test]
    fn test_imported_var_and_formatter() {
        let fixture = Fixture::new(&[
            (
                "/entry.st.css",
                r#":import { -st-from: "./vars.st.css"; -st-named: brand; }
                :import { -st-from: "./fmt.js"; -st-named: upper, broken, text; }"#,
            ),
            ("/vars.st.css", ":vars { brand: blue; }"),
        ]);
        fixture.host.register_module(
            "/fmt.js",
            JsValue::object([
                (
                    "upper",
                    JsValue::function(|args| Ok(args.join(" ").to_uppercase().into())),
                ),
                (
                    "broken",
                    JsValue::function(|_| Err("boom".to_string())),
                ),
                ("text", JsValue::from("plain")),
            ]),
        );
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();

        let value = evaluator.evaluate(&meta, "upper(value(brand), x)", Span::default(), &[]);
        assert_eq!(value.flatten(), "BLUE X");

        let failed = evaluator.evaluate(&meta, "broken(value(brand))", Span::default(), &[]);
        assert_eq!(failed.flatten(), "broken(blue)");

        let invalid = evaluator.evaluate(&meta, "text(1)", Span::default(), &[]);
        assert_eq!(invalid.flatten(), "text(1)");
        assert_eq!(
            codes(&evaluator),
            vec![
                DiagnosticCode::FailedToExecuteFormatter,
                DiagnosticCode::InvalidFormatter
            ]
        );
        assert_eq!(
            evaluator.diagnostics().iter().next().map(|d| d.message.as_str()),
            Some("failed to execute formatter \"broken\" with args: \"blue\": boom")
        );
    }

    #[test]
    fn test_overrides_and_hook() {
        let fixture = Fixture::new(&[(
            "/entry.st.css",
            ":vars { color: red; border: 1px solid value(color); }",
        )]);
        let meta = fixture.meta();
        let overrides = [VarOverrides {
            source: "/entry.st.css".into(),
            values: IndexMap::from([(SmolStr::new("color"), "green".to_string())]),
        }];
        let mut evaluator = fixture.evaluator();
        let value = evaluator.evaluate(&meta, "value(border)", Span::default(), &overrides);
        assert_eq!(value.flatten(), "1px solid green");

        let hook: ReplaceValueHook = Rc::new(
            |text: &str, target: HookTarget<'_>, is_local: bool, _: &[String]| match target {
                HookTarget::Var(name) if is_local => format!("var(--{name}, {text})"),
                _ => text.to_string(),
            },
        );
        let mut hooked = ValueEvaluator::new(
            StylableResolver::new(&fixture.host),
            &fixture.registry,
            "/entry.st.css",
            Some(hook),
        );
        let value = hooked.evaluate(&meta, "value(color)", Span::default(), &[]);
        assert_eq!(value.flatten(), "var(--color, red)");
    }

    #[test]
    fn test_hook_covers_modules_and_theme_overrides() {
        let fixture = Fixture::new(&[
            (
                "/entry.st.css",
                r#":import { -st-from: "./theme.st.css"; -st-theme: true; -st-named: accent; accent: gold; }
                :import { -st-from: "./tokens.js"; -st-named: tokens; }"#,
            ),
            ("/theme.st.css", ":vars { accent: purple; }"),
        ]);
        fixture.host.register_module(
            "/tokens.js",
            JsValue::object([("tokens", JsValue::object([("gap", JsValue::from("4px"))]))]),
        );
        let hook: ReplaceValueHook = Rc::new(
            |text: &str, target: HookTarget<'_>, is_local: bool, path: &[String]| match target {
                HookTarget::Var(name) => format!("{name}[{}]:{is_local}={text}", path.join(".")),
                HookTarget::Formatter(_) => text.to_string(),
            },
        );
        let meta = fixture.meta();
        let mut evaluator = ValueEvaluator::new(
            StylableResolver::new(&fixture.host),
            &fixture.registry,
            "/entry.st.css",
            Some(hook),
        );
        let value = evaluator.evaluate(
            &meta,
            "value(accent) value(tokens, gap)",
            Span::default(),
            &[],
        );
        assert_eq!(value.flatten(), "accent[]:false=gold tokens[gap]:false=4px");

        let missing = evaluator.evaluate(&meta, "value(tokens, nope)", Span::default(), &[]);
        assert_eq!(missing.flatten(), "value(tokens, nope)");
    }

    #[test]
    fn test_theme_override() {
        let fixture = Fixture::new(&[
            (
                "/entry.st.css",
                r#":import { -st-from: "./theme.st.css"; -st-theme: true; -st-named: accent; accent: gold; }"#,
            ),
            ("/theme.st.css", ":vars { accent: purple; }"),
        ]);
        let meta = fixture.meta();
        let mut evaluator = fixture.evaluator();
        let value = evaluator.evaluate(&meta, "value(accent)", Span::default(), &[]);
        assert_eq!(value.flatten(), "gold");
    }
}
