//! `-st-mixin` application.
//!
//! A mixin is either a local or imported class, whose rules are copied under
//! the host selector, or an imported function returning a style object.

use crate::js::{JsFunction, JsValue};
use crate::meta::{MixinRef, StylableMeta, Symbol};
use crate::resolver::{CssResolve, Resolved};
use crate::scoping::Cursor;
use crate::transform::{RuleContext, Transformation};
use crate::values::VarOverrides;
use indexmap::IndexMap;
use smol_str::SmolStr;
use stcss_diagnostics::DiagnosticCode;
use stcss_parser::{
    parse_selector, stringify_selectors, Declaration, Node, Rule, RuleId, Selector, SelectorNode,
    Span,
};
use std::rc::Rc;
use tracing::trace;

/// Id given to rules that do not come from a parsed stylesheet.
const SYNTHETIC_RULE: RuleId = RuleId(u32::MAX);

/// What the mixins of one rule contribute.
#[derive(Debug, Default)]
pub(crate) struct MixinOutput {
    /// Nodes merged into the host rule at the `-st-mixin` position.
    pub(crate) decls: Vec<Node>,
    /// Rules emitted after the host rule.
    pub(crate) rules: Vec<Node>,
}

enum MixinTarget {
    Css(CssResolve),
    Js(JsFunction),
}

impl Transformation<'_> {
    /// Applies a rule's mixins in declaration order.
    pub(crate) fn apply_mixins(
        &mut self,
        mixins: &[MixinRef],
        host: &[Selector],
        ctx: &RuleContext<'_>,
    ) -> MixinOutput {
        let mut output = MixinOutput::default();
        for mixin in mixins {
            match self.resolve_mixin(&ctx.meta, mixin) {
                Some(MixinTarget::Css(target)) => {
                    self.apply_css_mixin(mixin, target, host, ctx, &mut output)
                }
                Some(MixinTarget::Js(function)) => {
                    self.apply_js_mixin(mixin, &function, host, ctx, &mut output)
                }
                None => {}
            }
        }
        output
    }

    fn report_mixin(
        &mut self,
        meta: &StylableMeta,
        mixin: &MixinRef,
        code: DiagnosticCode,
        message: String,
    ) {
        let diagnostic = self
            .evaluator
            .locate(&meta.source, code, message, mixin.span)
            .with_word(mixin.name.as_str());
        self.evaluator.report(diagnostic);
    }

    fn resolve_mixin(&mut self, meta: &Rc<StylableMeta>, mixin: &MixinRef) -> Option<MixinTarget> {
        let Some(id) = meta.get(&mixin.name) else {
            self.report_mixin(
                meta,
                mixin,
                DiagnosticCode::UnknownMixin,
                format!("unknown mixin \"{}\"", mixin.name),
            );
            return None;
        };
        let resolved = match meta.symbol(id) {
            Symbol::Class(class) if class.alias.is_none() => {
                Resolved::Css(CssResolve::new(Rc::clone(meta), id))
            }
            _ => self.resolver.deep_resolve(meta, id)?,
        };
        match resolved {
            Resolved::Css(css) => {
                if !matches!(css.symbol(), Symbol::Class(_)) {
                    let kind = css.symbol().kind_name();
                    self.report_mixin(
                        meta,
                        mixin,
                        DiagnosticCode::FailedToApplyMixin,
                        format!(
                            "failed to apply mixin \"{}\": cannot mix in a {kind}",
                            mixin.name
                        ),
                    );
                    None
                } else if css.is_root() {
                    self.report_mixin(
                        meta,
                        mixin,
                        DiagnosticCode::CannotMixinRoot,
                        format!(
                            "cannot use the root class of \"{}\" as mixin \"{}\"",
                            css.meta.source, mixin.name
                        ),
                    );
                    None
                } else {
                    Some(MixinTarget::Css(css))
                }
            }
            Resolved::Js(js) => match js.value {
                JsValue::Function(function) => Some(MixinTarget::Js(function)),
                other => {
                    self.report_mixin(
                        meta,
                        mixin,
                        DiagnosticCode::FailedToApplyMixin,
                        format!(
                            "failed to apply mixin \"{}\": not a function, got {}",
                            mixin.name,
                            other.kind_name()
                        ),
                    );
                    None
                }
            },
        }
    }

    fn apply_js_mixin(
        &mut self,
        mixin: &MixinRef,
        function: &JsFunction,
        host: &[Selector],
        ctx: &RuleContext<'_>,
        output: &mut MixinOutput,
    ) {
        let args: Vec<String> = mixin
            .args
            .iter()
            .map(|arg| {
                self.evaluator
                    .evaluate(&ctx.meta, arg, mixin.span, ctx.overrides)
                    .flatten()
            })
            .collect();
        let object = match function.call(&args) {
            Ok(JsValue::Object(object)) => object,
            Ok(other) => {
                self.report_mixin(
                    &ctx.meta,
                    mixin,
                    DiagnosticCode::FailedToApplyMixin,
                    format!(
                        "failed to apply mixin \"{}\": returned {}",
                        mixin.name,
                        other.kind_name()
                    ),
                );
                return;
            }
            Err(message) => {
                self.report_mixin(
                    &ctx.meta,
                    mixin,
                    DiagnosticCode::FailedToApplyMixin,
                    format!("failed to apply mixin \"{}\": {message}", mixin.name),
                );
                return;
            }
        };
        trace!(mixin = %mixin.name, "applying function mixin");

        let nodes = object_to_nodes(&object, mixin.span);
        let nested_ctx = RuleContext {
            meta: Rc::clone(&ctx.meta),
            overrides: ctx.overrides,
            host: Some(host),
            nesting: None,
        };
        for node in nodes {
            match node {
                Node::Decl(decl) => output
                    .decls
                    .push(Node::Decl(self.transform_decl(decl, ctx))),
                Node::Rule(rule) if rule.selector == "&" => {
                    for child in rule.nodes {
                        match child {
                            Node::Decl(decl) => output
                                .decls
                                .push(Node::Decl(self.transform_decl(decl, ctx))),
                            Node::Rule(nested) => output
                                .rules
                                .extend(self.transform_rule(nested, &nested_ctx)),
                            other => output.decls.push(other),
                        }
                    }
                }
                Node::Rule(rule) => output.rules.extend(self.transform_rule(rule, &nested_ctx)),
                other => output.decls.push(other),
            }
        }
    }

    fn apply_css_mixin(
        &mut self,
        mixin: &MixinRef,
        target: CssResolve,
        host: &[Selector],
        ctx: &RuleContext<'_>,
        output: &mut MixinOutput,
    ) {
        let name = target.symbol().name().clone();
        let source = target.meta.source.clone();
        if let Some(start) = self
            .mixin_stack
            .iter()
            .position(|(file, class)| *file == source && *class == name)
        {
            let mut trace: Vec<String> = self.mixin_stack[start..]
                .iter()
                .map(|(file, class)| format!("{file}: {class}"))
                .collect();
            trace.push(format!("{source}: {name}"));
            let diagnostic = self
                .evaluator
                .locate(
                    &ctx.meta.source,
                    DiagnosticCode::CyclicMixin,
                    format!("circular mixin found: \"{}\"", mixin.name),
                    mixin.span,
                )
                .with_word(mixin.name.as_str())
                .with_trace(trace);
            self.evaluator.report(diagnostic);
            return;
        }
        trace!(mixin = %mixin.name, from = %source, "applying class mixin");

        let mut overrides = Vec::with_capacity(ctx.overrides.len() + 1);
        let values = self.mixin_options(mixin, ctx);
        if !values.is_empty() {
            overrides.push(VarOverrides {
                source: source.clone(),
                values,
            });
        }
        overrides.extend(ctx.overrides.iter().cloned());

        let cursor = Cursor {
            chain: self.resolver.resolve_chain(target.clone()),
        };
        let mixin_ctx = RuleContext {
            meta: Rc::clone(&target.meta),
            overrides: &overrides,
            host: Some(host),
            nesting: Some(&cursor),
        };

        self.mixin_stack.push((source, name.clone()));
        for (rule, is_host) in class_rules(&target.meta, &name) {
            let mut nodes = self.transform_rule(rule, &mixin_ctx).into_iter();
            if is_host {
                if let Some(Node::Rule(merged)) = nodes.next() {
                    output.decls.extend(merged.nodes);
                }
            }
            output.rules.extend(nodes);
        }
        self.mixin_stack.pop();
    }

    /// Evaluates `name value` options into variable overrides.
    fn mixin_options(&mut self, mixin: &MixinRef, ctx: &RuleContext<'_>) -> IndexMap<SmolStr, String> {
        let mut values = IndexMap::new();
        for arg in &mixin.args {
            let arg = arg.trim();
            let Some((name, value)) = arg.split_once(char::is_whitespace) else {
                continue;
            };
            let value = self
                .evaluator
                .evaluate(&ctx.meta, value.trim(), mixin.span, ctx.overrides)
                .flatten();
            values.insert(SmolStr::new(name), value);
        }
        values
    }
}

/// Top-level rules of `meta` whose every selector starts with `.class`.
///
/// The class is replaced by `&`. The flag is true when the rule selects
/// exactly the class, so its declarations merge into the host.
fn class_rules(meta: &StylableMeta, class: &str) -> Vec<(Rule, bool)> {
    let mut rules = Vec::new();
    for node in &meta.ast.nodes {
        let Node::Rule(rule) = node else {
            continue;
        };
        let mut selectors = parse_selector(&rule.selector);
        let matches = !selectors.is_empty()
            && selectors.iter().all(|selector| {
                matches!(selector.nodes.first(), Some(SelectorNode::Class(name)) if name == class)
            });
        if !matches {
            continue;
        }
        for selector in &mut selectors {
            selector.nodes[0] = SelectorNode::Nesting;
        }
        let is_host = selectors
            .iter()
            .all(|selector| selector.nodes == [SelectorNode::Nesting]);
        let mut rule = rule.clone();
        rule.selector = stringify_selectors(&selectors);
        rules.push((rule, is_host));
    }
    rules
}

/// Converts a style object into declarations and rules.
///
/// Scalar values become declarations and arrays become one declaration per
/// item. Object values become rules keyed by selector.
fn object_to_nodes(object: &IndexMap<String, JsValue>, span: Span) -> Vec<Node> {
    let mut nodes = Vec::new();
    for (key, value) in object {
        match value {
            JsValue::Object(inner) => nodes.push(Node::Rule(Rule {
                id: SYNTHETIC_RULE,
                selector: key.clone(),
                nodes: object_to_nodes(inner, span),
                span,
                selector_span: span,
            })),
            JsValue::Array(items) => {
                for item in items {
                    if let Some(text) = item.as_css_string() {
                        nodes.push(Node::Decl(Declaration::synthetic(key.as_str(), text, span)));
                    }
                }
            }
            other => {
                if let Some(text) = other.as_css_string() {
                    nodes.push(Node::Decl(Declaration::synthetic(key.as_str(), text, span)));
                }
            }
        }
    }
    nodes
}
