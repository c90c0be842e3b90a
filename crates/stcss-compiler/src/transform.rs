//! Stylesheet transformation: scoped CSS plus an export map.
//!
//! The transformer works on a clone of the processed AST. Selector scoping
//! lives in [`crate::scoping`], mixin application in [`crate::mixins`] and
//! the export map in [`crate::exports`]; this module drives the walk over
//! rules, at-rules and declarations.

use crate::custom_values::CustomValueRegistry;
use crate::exports::Exports;
use crate::host::ModuleHost;
use crate::meta::{StylableMeta, ROOT};
use crate::resolver::StylableResolver;
use crate::scoping::{add_root_prefix, splice_host, Cursor};
use crate::values::{ReplaceValueHook, ValueEvaluator, VarOverrides};
use camino::Utf8PathBuf;
use smol_str::SmolStr;
use stcss_diagnostics::{Diagnostic, DiagnosticCode};
use stcss_parser::{
    parse_selector, parse_value, stringify, stringify_selectors, stringify_value, Declaration,
    Node, Rule, Selector, Stylesheet, ValueNode,
};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Options for [`StylableTransformer`].
#[derive(Clone)]
pub struct TransformOptions {
    /// Joins a namespace and a local name.
    pub delimiter: SmolStr,
    /// Rewrites every substituted value.
    pub replace_value_hook: Option<ReplaceValueHook>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            delimiter: SmolStr::new_static("__"),
            replace_value_hook: None,
        }
    }
}

impl fmt::Debug for TransformOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformOptions")
            .field("delimiter", &self.delimiter)
            .field("replace_value_hook", &self.replace_value_hook.is_some())
            .finish()
    }
}

/// The output of transforming one stylesheet.
#[derive(Debug, Clone)]
pub struct TransformResult {
    /// The rewritten stylesheet.
    pub ast: Stylesheet,
    /// The printed CSS.
    pub css: String,
    pub exports: Exports,
    /// Processing diagnostics followed by transform diagnostics.
    pub diagnostics: Vec<Diagnostic>,
}

/// Transforms processed stylesheets.
pub struct StylableTransformer<'h> {
    resolver: StylableResolver<'h>,
    registry: CustomValueRegistry,
    options: TransformOptions,
}

impl<'h> StylableTransformer<'h> {
    pub fn new(host: &'h dyn ModuleHost, options: TransformOptions) -> Self {
        Self {
            resolver: StylableResolver::new(host),
            registry: CustomValueRegistry::new(),
            options,
        }
    }

    /// Replaces the global custom value types.
    pub fn with_registry(mut self, registry: CustomValueRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn resolver(&self) -> StylableResolver<'h> {
        self.resolver
    }

    pub fn registry(&self) -> &CustomValueRegistry {
        &self.registry
    }

    /// Transforms a processed stylesheet.
    pub fn transform(&self, meta: &Rc<StylableMeta>) -> TransformResult {
        debug!(source = %meta.source, "transforming stylesheet");
        let mut transformation = Transformation {
            resolver: self.resolver,
            evaluator: ValueEvaluator::new(
                self.resolver,
                &self.registry,
                meta.source.clone(),
                self.options.replace_value_hook.clone(),
            ),
            delimiter: &self.options.delimiter,
            origin: Rc::clone(meta),
            mixin_stack: Vec::new(),
        };
        transformation.report_imports();

        let ctx = RuleContext {
            meta: Rc::clone(meta),
            overrides: &[],
            host: None,
            nesting: None,
        };
        let nodes = transformation.transform_nodes(meta.ast.nodes.clone(), &ctx, false);
        let ast = Stylesheet {
            nodes,
            span: meta.ast.span,
        };
        let exports = transformation.build_exports();
        let css = stringify(&ast);

        let mut diagnostics = meta.diagnostics.clone();
        diagnostics.extend(transformation.evaluator.take_diagnostics());
        debug!(
            source = %meta.source,
            exports = exports.len(),
            diagnostics = diagnostics.len(),
            "transformed stylesheet"
        );
        TransformResult {
            ast,
            css,
            exports,
            diagnostics,
        }
    }
}

/// Where a rule is being transformed.
pub(crate) struct RuleContext<'c> {
    /// The file whose symbols the rule refers to.
    pub(crate) meta: Rc<StylableMeta>,
    pub(crate) overrides: &'c [VarOverrides],
    /// Scoped selectors replacing `&` in mixed-in rules.
    pub(crate) host: Option<&'c [Selector]>,
    /// Cursor used for `&` while scoping.
    pub(crate) nesting: Option<&'c Cursor>,
}

/// State of a single `transform` call.
pub(crate) struct Transformation<'t> {
    pub(crate) resolver: StylableResolver<'t>,
    pub(crate) evaluator: ValueEvaluator<'t>,
    pub(crate) delimiter: &'t str,
    pub(crate) origin: Rc<StylableMeta>,
    /// CSS mixins being applied, as `(file, class)`.
    pub(crate) mixin_stack: Vec<(Utf8PathBuf, SmolStr)>,
}

impl Transformation<'_> {
    /// `<namespace><delimiter><name>` in `meta`.
    pub(crate) fn scoped_name(&self, meta: &StylableMeta, name: &str) -> String {
        format!("{}{}{}", meta.namespace, self.delimiter, name)
    }

    /// Reports imports whose target or named exports cannot be found.
    fn report_imports(&mut self) {
        let origin = Rc::clone(&self.origin);
        let host = self.resolver.host();
        for imported in &origin.imports {
            let missing: Vec<&SmolStr> = if imported.is_css {
                match host.process(&imported.from) {
                    Ok(target) => imported
                        .named
                        .values()
                        .filter(|exported| target.get(exported).is_none())
                        .collect(),
                    Err(error) => {
                        self.report_unknown_import(&origin, imported.span, &imported.request, &error);
                        continue;
                    }
                }
            } else {
                match host.require(&imported.from) {
                    Ok(module) => imported
                        .named
                        .values()
                        .filter(|exported| module.get(exported).is_none())
                        .collect(),
                    Err(error) => {
                        self.report_unknown_import(&origin, imported.span, &imported.request, &error);
                        continue;
                    }
                }
            };
            for exported in missing {
                let diagnostic = Diagnostic::new(
                    DiagnosticCode::UnknownImportedSymbol,
                    format!(
                        "cannot find export \"{exported}\" in \"{}\"",
                        imported.request
                    ),
                    imported.span,
                )
                .with_word(exported.as_str());
                self.evaluator.report(diagnostic);
            }
        }
    }

    fn report_unknown_import(
        &mut self,
        origin: &StylableMeta,
        span: stcss_parser::Span,
        request: &str,
        error: &dyn std::error::Error,
    ) {
        let diagnostic = self.evaluator.locate(
            &origin.source,
            DiagnosticCode::UnknownImport,
            format!("cannot resolve imported file \"{request}\": {error}"),
            span,
        );
        self.evaluator.report(diagnostic);
    }

    pub(crate) fn transform_nodes(
        &mut self,
        nodes: Vec<Node>,
        ctx: &RuleContext<'_>,
        in_keyframes: bool,
    ) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Rule(mut rule) if in_keyframes => {
                    rule.nodes = self.transform_block(rule.nodes, ctx);
                    out.push(Node::Rule(rule));
                }
                Node::Rule(rule) => out.extend(self.transform_rule(rule, ctx)),
                Node::AtRule(mut at) => {
                    let is_keyframes = at.name.ends_with("keyframes");
                    if is_keyframes {
                        let name = at.params.trim();
                        if ctx.meta.keyframes.iter().any(|k| k.name == name) {
                            at.params = self.scoped_name(&ctx.meta, name);
                        }
                    }
                    if let Some(children) = at.nodes.take() {
                        at.nodes = Some(self.transform_nodes(children, ctx, is_keyframes));
                    }
                    out.push(Node::AtRule(at));
                }
                Node::Decl(decl) => out.push(Node::Decl(self.transform_decl(decl, ctx))),
                Node::Comment(comment) => out.push(Node::Comment(comment)),
            }
        }
        out
    }

    /// Rewrites the declarations of a block without touching selectors.
    fn transform_block(&mut self, nodes: Vec<Node>, ctx: &RuleContext<'_>) -> Vec<Node> {
        nodes
            .into_iter()
            .filter(|node| !matches!(node, Node::Decl(d) if d.prop.starts_with("-st-")))
            .map(|node| match node {
                Node::Decl(decl) => Node::Decl(self.transform_decl(decl, ctx)),
                other => other,
            })
            .collect()
    }

    /// Scopes a rule's selectors for the given context.
    pub(crate) fn scope_rule_selectors(
        &mut self,
        rule: &Rule,
        ctx: &RuleContext<'_>,
    ) -> Vec<Selector> {
        let selectors = parse_selector(&rule.selector);
        let mut scoped = Vec::new();
        for selector in &selectors {
            let branches =
                self.scope_selector(&ctx.meta, selector, ctx.nesting, rule.selector_span);
            match ctx.host {
                None => {
                    let root = self.scoped_name(&ctx.meta, ROOT);
                    scoped.extend(branches.iter().map(|s| add_root_prefix(s, &root)));
                }
                Some(host) => {
                    for branch in &branches {
                        scoped.extend(splice_host(&branch.selector, host));
                    }
                }
            }
        }
        scoped
    }

    /// Transforms one rule; mixed-in rules follow the rule itself.
    pub(crate) fn transform_rule(&mut self, rule: Rule, ctx: &RuleContext<'_>) -> Vec<Node> {
        let scoped = self.scope_rule_selectors(&rule, ctx);
        let mixins = ctx.meta.mixins.get(&rule.id).cloned();

        let mut nodes = Vec::with_capacity(rule.nodes.len());
        let mut trailing = Vec::new();
        let mut mixins_applied = false;
        for node in rule.nodes {
            match node {
                Node::Decl(decl) if decl.prop == "-st-mixin" => {
                    if mixins_applied {
                        continue;
                    }
                    mixins_applied = true;
                    if let Some(mixins) = &mixins {
                        let output = self.apply_mixins(mixins, &scoped, ctx);
                        nodes.extend(output.decls);
                        trailing.extend(output.rules);
                    }
                }
                Node::Decl(decl) if decl.prop.starts_with("-st-") => {}
                Node::Decl(decl) => nodes.push(Node::Decl(self.transform_decl(decl, ctx))),
                Node::Rule(nested) => {
                    let nested_ctx = RuleContext {
                        meta: Rc::clone(&ctx.meta),
                        overrides: ctx.overrides,
                        host: Some(&scoped),
                        nesting: None,
                    };
                    trailing.extend(self.transform_rule(nested, &nested_ctx));
                }
                Node::AtRule(mut at) => {
                    if let Some(children) = at.nodes.take() {
                        at.nodes = Some(self.transform_nodes(children, ctx, false));
                    }
                    nodes.push(Node::AtRule(at));
                }
                Node::Comment(comment) => nodes.push(Node::Comment(comment)),
            }
        }

        let mut out = Vec::with_capacity(trailing.len() + 1);
        out.push(Node::Rule(Rule {
            id: rule.id,
            selector: stringify_selectors(&scoped),
            nodes,
            span: rule.span,
            selector_span: rule.selector_span,
        }));
        out.extend(trailing);
        out
    }

    /// Evaluates a declaration value and scopes animation names.
    pub(crate) fn transform_decl(&mut self, decl: Declaration, ctx: &RuleContext<'_>) -> Declaration {
        let value = self
            .evaluator
            .evaluate(&ctx.meta, &decl.value, decl.span, ctx.overrides)
            .flatten();
        let value = if matches!(decl.prop.as_str(), "animation" | "animation-name") {
            self.scope_animation(&ctx.meta, &value)
        } else {
            value
        };
        Declaration { value, ..decl }
    }

    fn scope_animation(&self, meta: &StylableMeta, value: &str) -> String {
        if meta.keyframes.is_empty() {
            return value.to_string();
        }
        let nodes: Vec<ValueNode> = parse_value(value)
            .into_iter()
            .map(|node| match node {
                ValueNode::Word(word) if meta.keyframes.iter().any(|k| k.name == word) => {
                    ValueNode::Word(self.scoped_name(meta, &word))
                }
                other => other,
            })
            .collect();
        stringify_value(&nodes)
    }
}
