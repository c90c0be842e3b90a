//! Builds the symbol table of a single stylesheet.
//!
//! Processing is a single walk over the parsed stylesheet with no access to
//! other files. Import, vars and definition at-rules are recorded and removed
//! from the stored AST; everything else stays for the transformer. Problems
//! become diagnostics on the returned table, never errors.

use crate::directives::{
    parse_mixins, parse_name_list, parse_named, parse_st_import, parse_states, strip_quotes,
};
use crate::host::resolve_request;
use crate::meta::{
    ClassSymbol, ElementSymbol, ImportKind, ImportSymbol, Imported, KeyframesRef, StylableMeta,
    Symbol, SymbolId, VarSymbol, ROOT,
};
use crate::namespace::{default_namespace, is_valid_namespace, NamespaceResolver};
use crate::native::is_component_element;
use camino::Utf8Path;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use stcss_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
use stcss_parser::{
    parse_selector, stringify_selectors, AtRule, Node, Rule, Selector, SelectorNode, Span,
    Stylesheet,
};
use std::fmt;
use tracing::debug;

/// Options for building symbol tables.
#[derive(Clone, Default)]
pub struct ProcessOptions {
    /// Overrides how namespaces are chosen.
    pub namespace_resolver: Option<NamespaceResolver>,
}

impl fmt::Debug for ProcessOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessOptions")
            .field("namespace_resolver", &self.namespace_resolver.is_some())
            .finish()
    }
}

/// Parses and processes stylesheet source text.
pub fn process_source(source: &str, path: &Utf8Path, options: &ProcessOptions) -> StylableMeta {
    let result = stcss_parser::parse(source);
    let mut meta = process_stylesheet(result.stylesheet, path, options);
    let mut diagnostics: Vec<Diagnostic> = result
        .errors
        .iter()
        .map(|error| Diagnostic::new(DiagnosticCode::ParseError, error.to_string(), error.span))
        .collect();
    diagnostics.append(&mut meta.diagnostics);
    meta.diagnostics = diagnostics;
    meta
}

/// Processes an already parsed stylesheet.
pub fn process_stylesheet(
    ast: Stylesheet,
    path: &Utf8Path,
    options: &ProcessOptions,
) -> StylableMeta {
    StylableProcessor::new(path, options).process(ast)
}

/// Expands `:--name` uses into every alternative of the custom selector.
pub(crate) fn expand_custom_selectors(
    selector: &Selector,
    custom: &IndexMap<SmolStr, Vec<Selector>>,
) -> Vec<Selector> {
    let mut results: Vec<Vec<SelectorNode>> = vec![Vec::new()];
    for node in &selector.nodes {
        let alternatives = match node {
            SelectorNode::PseudoClass {
                name,
                content: None,
            } => name.strip_prefix("--").and_then(|name| custom.get(name)),
            _ => None,
        };
        match alternatives {
            Some(alternatives) => {
                results = results
                    .into_iter()
                    .flat_map(|prefix| {
                        alternatives.iter().map(move |alt| {
                            let mut nodes = prefix.clone();
                            nodes.extend(alt.nodes.iter().cloned());
                            nodes
                        })
                    })
                    .collect();
            }
            None => {
                for nodes in &mut results {
                    nodes.push(node.clone());
                }
            }
        }
    }
    results.into_iter().map(Selector::new).collect()
}

fn mentions_pseudo_class(selectors: &[Selector], names: &[&str]) -> bool {
    selectors.iter().any(|selector| {
        selector.nodes.iter().any(|node| match node {
            SelectorNode::PseudoClass { name, .. } => names.contains(&name.as_str()),
            SelectorNode::NestedPseudoClass { selectors, .. } => {
                mentions_pseudo_class(selectors, names)
            }
            _ => false,
        })
    })
}

struct StylableProcessor<'o> {
    meta: StylableMeta,
    options: &'o ProcessOptions,
    diagnostics: Diagnostics,
    explicit_namespace: Option<String>,
}

impl<'o> StylableProcessor<'o> {
    fn new(path: &Utf8Path, options: &'o ProcessOptions) -> Self {
        Self {
            meta: StylableMeta::new(path),
            options,
            diagnostics: Diagnostics::new(),
            explicit_namespace: None,
        }
    }

    fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::new(code, message, span));
    }

    fn report_word(
        &mut self,
        code: DiagnosticCode,
        message: impl Into<String>,
        span: Span,
        word: &str,
    ) {
        self.diagnostics
            .push(Diagnostic::new(code, message, span).with_word(word));
    }

    fn process(mut self, ast: Stylesheet) -> StylableMeta {
        let span = ast.span;
        let mut rest = Vec::new();
        for node in ast.nodes {
            match node {
                Node::AtRule(at) if at.name == "namespace" => self.handle_namespace(&at),
                Node::AtRule(at) if at.name == "st-import" => self.handle_st_import(&at),
                Node::AtRule(at) if at.name == "custom-selector" => {
                    self.handle_custom_selector(&at)
                }
                Node::Rule(rule) if rule.selector == ":import" => self.handle_import(&rule),
                other => rest.push(other),
            }
        }
        self.register_imports();

        let nodes = self.process_nodes(rest, true);
        self.meta.ast = Stylesheet { nodes, span };
        self.meta.namespace = match &self.options.namespace_resolver {
            Some(resolver) => resolver(self.explicit_namespace.as_deref(), &self.meta.source),
            None => default_namespace(self.explicit_namespace.as_deref(), &self.meta.source),
        };
        debug!(
            source = %self.meta.source,
            namespace = %self.meta.namespace,
            symbols = self.meta.mapped_symbols.len(),
            imports = self.meta.imports.len(),
            "processed stylesheet"
        );
        self.meta.diagnostics = self.diagnostics.into_vec();
        self.meta
    }

    // === Definitions ===

    fn handle_namespace(&mut self, at: &AtRule) {
        let namespace = strip_quotes(&at.params);
        if is_valid_namespace(namespace) {
            self.explicit_namespace = Some(namespace.to_string());
        } else {
            self.report_word(
                DiagnosticCode::InvalidNamespace,
                format!("invalid namespace \"{namespace}\""),
                at.span,
                namespace,
            );
        }
    }

    fn handle_import(&mut self, rule: &Rule) {
        let mut from = None;
        let mut default_export = None;
        let mut named = IndexMap::new();
        let mut theme = false;
        let mut others = Vec::new();
        for decl in rule.decls() {
            match decl.prop.as_str() {
                "-st-from" => from = Some(strip_quotes(&decl.value).to_string()),
                "-st-default" => default_export = Some(SmolStr::new(decl.value.trim())),
                "-st-named" => match parse_named(&decl.value) {
                    Ok(pairs) => named.extend(pairs),
                    Err(message) => {
                        self.report(DiagnosticCode::InvalidStImport, message, decl.span)
                    }
                },
                "-st-theme" => theme = decl.value.trim() == "true",
                _ => others.push(decl.clone()),
            }
        }
        let Some(request) = from.filter(|r| !r.trim().is_empty()) else {
            self.report(
                DiagnosticCode::MissingFrom,
                "\":import\" is missing \"-st-from\"",
                rule.span,
            );
            return;
        };
        if !theme {
            for decl in &others {
                self.report_word(
                    DiagnosticCode::IllegalPropInImport,
                    format!("\"{}\" cannot be used in \":import\"", decl.prop),
                    decl.span,
                    &decl.prop,
                );
            }
        }
        self.push_import(request, default_export, named, rule.span, theme, others);
    }

    fn handle_st_import(&mut self, at: &AtRule) {
        match parse_st_import(&at.params) {
            Ok(import) => {
                let named = import.named.into_iter().collect();
                self.push_import(
                    import.request,
                    import.default_export,
                    named,
                    at.span,
                    false,
                    Vec::new(),
                );
            }
            Err(message) => self.report(
                DiagnosticCode::InvalidStImport,
                format!("invalid @st-import: {message}"),
                at.span,
            ),
        }
    }

    fn push_import(
        &mut self,
        request: String,
        default_export: Option<SmolStr>,
        named: IndexMap<SmolStr, SmolStr>,
        span: Span,
        theme: bool,
        overrides: Vec<stcss_parser::Declaration>,
    ) {
        let context = self.meta.context().to_path_buf();
        self.meta.imports.push(Imported {
            from: resolve_request(&context, &request),
            is_css: request.ends_with(".css"),
            request,
            default_export,
            named,
            span,
            theme,
            overrides,
            context,
        });
    }

    fn register_imports(&mut self) {
        let bindings: Vec<(usize, SmolStr, ImportKind, Span)> = self
            .meta
            .imports
            .iter()
            .enumerate()
            .flat_map(|(index, imported)| {
                let default = imported
                    .default_export
                    .iter()
                    .map(move |name| (index, name.clone(), ImportKind::Default, imported.span));
                let named = imported.named.iter().map(move |(local, exported)| {
                    (
                        index,
                        local.clone(),
                        ImportKind::Named {
                            exported: exported.clone(),
                        },
                        imported.span,
                    )
                });
                default.chain(named)
            })
            .collect();

        let context = self.meta.context().to_path_buf();
        for (index, name, kind, span) in bindings {
            if self.meta.mapped_symbols.contains_key(&name) {
                self.report_word(
                    DiagnosticCode::RedeclareSymbol,
                    format!("redeclare symbol \"{name}\""),
                    span,
                    &name,
                );
                continue;
            }
            let id = self.meta.alloc(Symbol::Import(ImportSymbol {
                name: name.clone(),
                kind,
                import: index,
                context: context.clone(),
            }));
            self.meta.mapped_symbols.insert(name, id);
        }
    }

    fn handle_custom_selector(&mut self, at: &AtRule) {
        let params = at.params.trim();
        let (name, selector) = params
            .split_once(char::is_whitespace)
            .unwrap_or((params, ""));
        let Some(name) = name.strip_prefix(":--").filter(|n| !n.is_empty()) else {
            self.report(
                DiagnosticCode::InvalidCustomSelector,
                format!("invalid custom selector \"{params}\""),
                at.span,
            );
            return;
        };
        let selectors = parse_selector(selector.trim());
        if selectors.is_empty() {
            self.report_word(
                DiagnosticCode::InvalidCustomSelector,
                format!("custom selector \":--{name}\" is empty"),
                at.span,
                name,
            );
            return;
        }
        let expanded = selectors
            .iter()
            .flat_map(|s| expand_custom_selectors(s, &self.meta.custom_selectors))
            .collect();
        self.meta
            .custom_selectors
            .insert(SmolStr::new(name), expanded);
    }

    fn handle_vars(&mut self, rule: &Rule) {
        let mut pending_type: Option<SmolStr> = None;
        for node in &rule.nodes {
            match node {
                Node::Comment(comment) => {
                    pending_type = comment
                        .text
                        .strip_prefix("@type")
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(SmolStr::new);
                }
                Node::Decl(decl) => {
                    let value_type = pending_type.take();
                    if self.meta.mapped_symbols.contains_key(&decl.prop) {
                        self.report_word(
                            DiagnosticCode::RedeclareSymbol,
                            format!("redeclare symbol \"{}\"", decl.prop),
                            decl.span,
                            &decl.prop,
                        );
                        continue;
                    }
                    let id = self.meta.alloc(Symbol::Var(VarSymbol {
                        name: decl.prop.clone(),
                        text: decl.value.clone(),
                        value_type,
                        span: decl.span,
                    }));
                    self.meta.mapped_symbols.insert(decl.prop.clone(), id);
                    self.meta.vars.push(id);
                }
                _ => pending_type = None,
            }
        }
    }

    // === Rules ===

    fn process_nodes(&mut self, nodes: Vec<Node>, top_level: bool) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Rule(rule) if top_level && rule.selector == ":vars" => {
                    self.handle_vars(&rule)
                }
                Node::Rule(mut rule) => {
                    let selectors = parse_selector(&rule.selector);
                    if mentions_pseudo_class(&selectors, &["import", "vars"]) {
                        self.report(
                            DiagnosticCode::ForbiddenDefInComplexSelector,
                            format!(
                                "\":import\" and \":vars\" must be standalone top-level selectors, found \"{}\"",
                                rule.selector
                            ),
                            rule.selector_span,
                        );
                        continue;
                    }
                    if rule.selector.contains(":--") {
                        let expanded: Vec<Selector> = selectors
                            .iter()
                            .flat_map(|s| expand_custom_selectors(s, &self.meta.custom_selectors))
                            .collect();
                        rule.selector = stringify_selectors(&expanded);
                        self.handle_rule(&rule, &expanded);
                    } else {
                        self.handle_rule(&rule, &selectors);
                    }
                    let children = std::mem::take(&mut rule.nodes);
                    rule.nodes = self.process_nodes(children, false);
                    out.push(Node::Rule(rule));
                }
                Node::AtRule(at) if at.name.ends_with("keyframes") => {
                    let name = at.params.trim();
                    if !name.is_empty() && !self.meta.keyframes.iter().any(|k| k.name == name) {
                        self.meta.keyframes.push(KeyframesRef {
                            name: SmolStr::new(name),
                            span: at.span,
                        });
                    }
                    out.push(Node::AtRule(at));
                }
                Node::AtRule(mut at) => {
                    if let Some(children) = at.nodes.take() {
                        at.nodes = Some(self.process_nodes(children, false));
                    }
                    out.push(Node::AtRule(at));
                }
                other => out.push(other),
            }
        }
        out
    }

    fn handle_rule(&mut self, rule: &Rule, selectors: &[Selector]) {
        for selector in selectors {
            self.collect_symbols(selector, rule.selector_span);
        }

        let single = match selectors {
            [selector] => Some(selector),
            _ => None,
        };
        let simple_class = single
            .and_then(Selector::as_simple_class)
            .and_then(|name| self.meta.classes.get(name).copied());
        let simple_element = single.and_then(Selector::as_simple_element).is_some();

        let mut seen = FxHashSet::default();
        for decl in rule.decls() {
            if !decl.prop.starts_with("-st-") {
                continue;
            }
            if !seen.insert(decl.prop.clone()) {
                self.report_word(
                    DiagnosticCode::OverrideDirective,
                    format!("override \"{}\" on the same rule", decl.prop),
                    decl.span,
                    &decl.prop,
                );
            }
            match decl.prop.as_str() {
                "-st-extends" => match simple_class {
                    Some(class) => self.handle_extends(class, decl.value.trim(), decl.span),
                    None => self.report(
                        DiagnosticCode::CannotExtendInComplexSelector,
                        format!("cannot extend in complex selector \"{}\"", rule.selector),
                        decl.span,
                    ),
                },
                "-st-states" => match simple_class {
                    Some(class) => {
                        let (states, errors) = parse_states(&decl.value);
                        for error in errors {
                            self.report(DiagnosticCode::InvalidStateDefinition, error, decl.span);
                        }
                        if let Symbol::Class(symbol) = self.meta.symbol_mut(class) {
                            symbol.states = Some(states);
                        }
                    }
                    None if simple_element => self.report(
                        DiagnosticCode::StateDefinitionInElement,
                        "cannot define pseudo-states on an element selector",
                        decl.span,
                    ),
                    None => self.report(
                        DiagnosticCode::StateDefinitionInComplex,
                        format!(
                            "cannot define pseudo-states in complex selector \"{}\"",
                            rule.selector
                        ),
                        decl.span,
                    ),
                },
                "-st-mixin" => match parse_mixins(&decl.value, decl.span) {
                    Ok(mixins) => {
                        self.meta.mixins.insert(rule.id, mixins);
                    }
                    Err(message) => self.report(DiagnosticCode::InvalidMixin, message, decl.span),
                },
                "-st-compose" => match simple_class {
                    Some(class) => self.handle_compose(class, &decl.value, decl.span),
                    None => self.report(
                        DiagnosticCode::CannotExtendInComplexSelector,
                        format!("cannot compose in complex selector \"{}\"", rule.selector),
                        decl.span,
                    ),
                },
                "-st-global" => {
                    let global = parse_selector(strip_quotes(&decl.value));
                    match simple_class {
                        Some(class) if !global.is_empty() => {
                            if let Symbol::Class(symbol) = self.meta.symbol_mut(class) {
                                symbol.global = Some(global);
                            }
                        }
                        Some(_) => self.report(
                            DiagnosticCode::InvalidGlobal,
                            "\"-st-global\" requires a selector",
                            decl.span,
                        ),
                        None => self.report(
                            DiagnosticCode::InvalidGlobal,
                            format!(
                                "\"-st-global\" is only allowed on a simple class, found \"{}\"",
                                rule.selector
                            ),
                            decl.span,
                        ),
                    }
                }
                _ => {}
            }
        }
    }

    fn handle_extends(&mut self, class: SymbolId, target: &str, span: Span) {
        let alias = self.meta.symbol(class).as_class().and_then(|c| c.alias);
        let resolved = match self.meta.get(target) {
            Some(id) if id == class => alias,
            Some(id) if matches!(self.meta.symbol(id), Symbol::Var(_)) => None,
            other => other,
        };
        let Some(extends) = resolved else {
            self.report_word(
                DiagnosticCode::CannotResolveExtends,
                format!("cannot resolve \"-st-extends\" type \"{target}\""),
                span,
                target,
            );
            return;
        };
        if let Symbol::Class(symbol) = self.meta.symbol_mut(class) {
            symbol.extends = Some(extends);
        }
    }

    fn handle_compose(&mut self, class: SymbolId, value: &str, span: Span) {
        let mut compose = Vec::new();
        for name in parse_name_list(value) {
            match self.meta.get(&name) {
                Some(id) if id != class => compose.push(id),
                _ => self.report_word(
                    DiagnosticCode::UnknownCompose,
                    format!("cannot compose unknown class \"{name}\""),
                    span,
                    &name,
                ),
            }
        }
        if let Symbol::Class(symbol) = self.meta.symbol_mut(class) {
            symbol.compose = compose;
        }
    }

    fn collect_symbols(&mut self, selector: &Selector, span: Span) {
        let mut seen_class = false;
        let mut scope_broken = false;
        for node in &selector.nodes {
            match node {
                SelectorNode::Class(name) => {
                    if name == ROOT && scope_broken {
                        self.report_word(
                            DiagnosticCode::RootAfterSpacing,
                            "\".root\" can only be used as the first part of a selector",
                            span,
                            ROOT,
                        );
                    }
                    self.add_class(name, span);
                    seen_class = true;
                }
                SelectorNode::Element(name) if is_component_element(name) => {
                    self.add_element(name, span);
                }
                SelectorNode::Element(name) => {
                    if !seen_class {
                        self.report_word(
                            DiagnosticCode::UnscopedElement,
                            format!("unscoped native element \"{name}\" will affect all elements of the same type in the document"),
                            span,
                            name,
                        );
                    }
                    scope_broken = true;
                }
                SelectorNode::Spacing | SelectorNode::Operator(_) => scope_broken = true,
                SelectorNode::NestedPseudoClass { name, selectors } if name != "global" => {
                    for inner in selectors {
                        self.collect_nested(inner, span);
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_nested(&mut self, selector: &Selector, span: Span) {
        for node in &selector.nodes {
            match node {
                SelectorNode::Class(name) => self.add_class(name, span),
                SelectorNode::Element(name) if is_component_element(name) => {
                    self.add_element(name, span)
                }
                SelectorNode::NestedPseudoClass { name, selectors } if name != "global" => {
                    for inner in selectors {
                        self.collect_nested(inner, span);
                    }
                }
                _ => {}
            }
        }
    }

    fn add_class(&mut self, name: &str, span: Span) {
        if self.meta.classes.contains_key(name) {
            return;
        }
        let alias = match self.meta.get(name) {
            Some(id) if matches!(self.meta.symbol(id), Symbol::Import(_)) => Some(id),
            Some(_) => {
                self.report_word(
                    DiagnosticCode::RedeclareSymbol,
                    format!("redeclare symbol \"{name}\""),
                    span,
                    name,
                );
                return;
            }
            None => None,
        };
        let name = SmolStr::new(name);
        let id = self.meta.alloc(Symbol::Class(ClassSymbol {
            name: name.clone(),
            alias,
            span,
            ..ClassSymbol::default()
        }));
        self.meta.mapped_symbols.insert(name.clone(), id);
        self.meta.classes.insert(name, id);
    }

    fn add_element(&mut self, name: &str, span: Span) {
        if self.meta.elements.contains_key(name) {
            return;
        }
        let alias = match self.meta.get(name) {
            Some(id) if matches!(self.meta.symbol(id), Symbol::Import(_)) => Some(id),
            Some(_) => {
                self.report_word(
                    DiagnosticCode::RedeclareSymbol,
                    format!("redeclare symbol \"{name}\""),
                    span,
                    name,
                );
                return;
            }
            None => None,
        };
        let name = SmolStr::new(name);
        let id = self.meta.alloc(Symbol::Element(ElementSymbol {
            name: name.clone(),
            alias,
            span,
        }));
        self.meta.mapped_symbols.insert(name.clone(), id);
        self.meta.elements.insert(name, id);
    }
}
