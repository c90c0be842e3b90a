//! Selector scoping.
//!
//! Selectors are rewritten node by node while a cursor tracks the
//! inheritance chain of the symbol the current compound refers to. States
//! and pseudo-elements are looked up along that chain. A single input
//! selector may fan out into several outputs when `:global(a, b)` or a
//! multi-selector custom selector is used as a pseudo-element.

use crate::meta::{StylableMeta, ROOT};
use crate::native::{
    is_component_element, is_native_pseudo_class, is_native_pseudo_element, is_vendor_prefixed,
};
use crate::resolver::{CssResolve, Resolved};
use crate::states::state_selector;
use crate::transform::Transformation;
use stcss_diagnostics::DiagnosticCode;
use stcss_parser::{Selector, SelectorNode, Span};
use std::rc::Rc;

/// The inheritance chain of the symbol a compound refers to.
#[derive(Debug, Clone)]
pub(crate) struct Cursor {
    pub(crate) chain: Vec<CssResolve>,
}

impl Cursor {
    fn new(chain: Vec<CssResolve>) -> Option<Self> {
        if chain.is_empty() {
            None
        } else {
            Some(Self { chain })
        }
    }
}

/// A scoped selector before root prefixing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedSelector {
    pub selector: Selector,
    /// True if the selector starts with `:global(...)` content.
    pub global_start: bool,
}

/// Prefixes a scoped selector with the root class.
///
/// Selectors that start with global content or whose first compound
/// already holds the root class are returned unchanged, so applying the
/// prefix twice is the same as applying it once.
pub fn add_root_prefix(scoped: &ScopedSelector, root_class: &str) -> Selector {
    if scoped.global_start || starts_with_root(&scoped.selector, root_class) {
        return scoped.selector.clone();
    }
    let mut nodes = Vec::with_capacity(scoped.selector.nodes.len() + 2);
    nodes.push(SelectorNode::Class(root_class.to_string()));
    if !scoped.selector.nodes.is_empty() {
        nodes.push(SelectorNode::Spacing);
    }
    nodes.extend(scoped.selector.nodes.iter().cloned());
    Selector::new(nodes)
}

fn starts_with_root(selector: &Selector, root_class: &str) -> bool {
    selector
        .nodes
        .iter()
        .take_while(|node| !node.is_combinator())
        .any(|node| matches!(node, SelectorNode::Class(name) if name == root_class))
}

/// Puts a mixed-in or nested selector under its host selectors.
///
/// `&` is replaced by each host; without `&` the host becomes an ancestor.
pub(crate) fn splice_host(selector: &Selector, hosts: &[Selector]) -> Vec<Selector> {
    let has_nesting = selector.nodes.contains(&SelectorNode::Nesting);
    hosts
        .iter()
        .map(|host| {
            let mut nodes = Vec::new();
            if has_nesting {
                for node in &selector.nodes {
                    match node {
                        SelectorNode::Nesting => nodes.extend(host.nodes.iter().cloned()),
                        other => nodes.push(other.clone()),
                    }
                }
            } else {
                nodes.extend(host.nodes.iter().cloned());
                nodes.push(SelectorNode::Spacing);
                nodes.extend(selector.nodes.iter().cloned());
            }
            Selector::new(nodes)
        })
        .collect()
}

/// One output selector under construction.
#[derive(Debug, Clone)]
struct Branch {
    nodes: Vec<SelectorNode>,
    cursor: Option<Cursor>,
    global_start: bool,
}

impl Branch {
    fn push_global(&self, nodes: &[SelectorNode]) -> Branch {
        let mut branch = self.clone();
        if branch.nodes.is_empty() {
            branch.global_start = true;
        }
        branch.nodes.extend(nodes.iter().cloned());
        branch.cursor = None;
        branch
    }
}

struct ScopeContext<'a> {
    meta: &'a Rc<StylableMeta>,
    nesting: Option<&'a Cursor>,
    root: Option<Cursor>,
    span: Span,
}

impl Transformation<'_> {
    /// Scopes one selector written in `meta`.
    pub(crate) fn scope_selector(
        &mut self,
        meta: &Rc<StylableMeta>,
        selector: &Selector,
        nesting: Option<&Cursor>,
        span: Span,
    ) -> Vec<ScopedSelector> {
        let cx = ScopeContext {
            meta,
            nesting,
            root: self.root_cursor(meta),
            span,
        };
        let start = cx.root.clone();
        self.scope_from(&cx, selector, start)
            .into_iter()
            .map(|branch| ScopedSelector {
                selector: Selector::new(branch.nodes),
                global_start: branch.global_start,
            })
            .collect()
    }

    fn root_cursor(&self, meta: &Rc<StylableMeta>) -> Option<Cursor> {
        Cursor::new(self.resolver.resolve_extends(meta, ROOT, false))
    }

    fn scope_from(
        &mut self,
        cx: &ScopeContext<'_>,
        selector: &Selector,
        start: Option<Cursor>,
    ) -> Vec<Branch> {
        let mut branches = vec![Branch {
            nodes: Vec::with_capacity(selector.nodes.len()),
            cursor: start,
            global_start: false,
        }];
        for node in &selector.nodes {
            let mut next = Vec::with_capacity(branches.len());
            for branch in branches {
                self.scope_node(cx, node, branch, &mut next);
            }
            branches = next;
        }
        branches
    }

    fn scope_node(
        &mut self,
        cx: &ScopeContext<'_>,
        node: &SelectorNode,
        mut branch: Branch,
        out: &mut Vec<Branch>,
    ) {
        match node {
            SelectorNode::Class(name) => self.scope_class(cx.meta, name, branch, out),
            SelectorNode::Element(name) => {
                self.scope_element(cx.meta, name, &mut branch);
                out.push(branch);
            }
            SelectorNode::Spacing | SelectorNode::Operator(_) => {
                branch.nodes.push(node.clone());
                branch.cursor = cx.root.clone();
                out.push(branch);
            }
            SelectorNode::PseudoElement(name) => self.scope_pseudo_element(cx, name, branch, out),
            SelectorNode::PseudoClass { name, content } => {
                self.scope_pseudo_class(cx, name, content.as_deref(), &mut branch);
                out.push(branch);
            }
            SelectorNode::NestedPseudoClass { name, selectors } if name == "global" => {
                if selectors.is_empty() {
                    out.push(branch);
                    return;
                }
                for selector in selectors {
                    out.push(branch.push_global(&selector.nodes));
                }
            }
            SelectorNode::NestedPseudoClass { name, selectors } => {
                let mut scoped = Vec::with_capacity(selectors.len());
                for selector in selectors {
                    let start = branch.cursor.clone();
                    scoped.extend(
                        self.scope_from(cx, selector, start)
                            .into_iter()
                            .map(|inner| Selector::new(inner.nodes)),
                    );
                }
                branch.nodes.push(SelectorNode::NestedPseudoClass {
                    name: name.clone(),
                    selectors: scoped,
                });
                out.push(branch);
            }
            SelectorNode::Nesting => {
                branch.nodes.push(SelectorNode::Nesting);
                branch.cursor = cx.nesting.cloned().or_else(|| cx.root.clone());
                out.push(branch);
            }
            SelectorNode::Universal => {
                branch.nodes.push(SelectorNode::Universal);
                branch.cursor = None;
                out.push(branch);
            }
            other => {
                branch.nodes.push(other.clone());
                out.push(branch);
            }
        }
    }

    /// The selector nodes standing for a resolved class.
    fn class_nodes(&self, target: &CssResolve) -> Vec<SelectorNode> {
        match target
            .symbol()
            .as_class()
            .and_then(|c| c.global.as_ref())
            .and_then(|global| global.first())
        {
            Some(global) => global.nodes.clone(),
            None => vec![SelectorNode::Class(
                self.scoped_name(&target.meta, target.symbol().name()),
            )],
        }
    }

    /// Follows an alias-only class to the class it names.
    fn alias_target(&self, target: CssResolve) -> CssResolve {
        if !target.symbol().is_alias_only() {
            return target;
        }
        match self.resolver.deep_resolve(&target.meta, target.symbol) {
            Some(Resolved::Css(resolved)) => resolved,
            _ => target,
        }
    }

    fn scope_class(
        &mut self,
        meta: &Rc<StylableMeta>,
        name: &str,
        mut branch: Branch,
        out: &mut Vec<Branch>,
    ) {
        let Some(&id) = meta.classes.get(name) else {
            branch.nodes.push(SelectorNode::Class(self.scoped_name(meta, name)));
            branch.cursor = None;
            out.push(branch);
            return;
        };
        let Some(class) = meta.symbol(id).as_class() else {
            out.push(branch);
            return;
        };

        if let Some(global) = &class.global {
            if global.is_empty() {
                out.push(branch);
                return;
            }
            for selector in global {
                out.push(branch.push_global(&selector.nodes));
            }
            return;
        }

        if meta.symbol(id).is_alias_only() {
            match self.resolver.deep_resolve(meta, id) {
                Some(Resolved::Css(target)) => {
                    branch.nodes.extend(self.class_nodes(&target));
                    branch.cursor = Cursor::new(self.resolver.resolve_chain(target));
                }
                _ => {
                    branch.nodes.push(SelectorNode::Class(self.scoped_name(meta, name)));
                    branch.cursor = None;
                }
            }
            out.push(branch);
            return;
        }

        let chain = self
            .resolver
            .resolve_chain(CssResolve::new(Rc::clone(meta), id));
        branch
            .nodes
            .push(SelectorNode::Class(self.scoped_name(meta, name)));
        if class.extends.is_some() {
            if let Some(parent) = chain.get(1) {
                let compound = self.class_nodes(parent);
                for node in compound {
                    if !branch.nodes.contains(&node) {
                        branch.nodes.push(node);
                    }
                }
            }
        }
        branch.cursor = Cursor::new(chain);
        out.push(branch);
    }

    fn scope_element(&mut self, meta: &Rc<StylableMeta>, name: &str, branch: &mut Branch) {
        if is_component_element(name) {
            if let Some(&id) = meta.elements.get(name) {
                let chain = self
                    .resolver
                    .resolve_chain(CssResolve::new(Rc::clone(meta), id));
                if let Some(target) = chain.get(1) {
                    branch.nodes.extend(self.class_nodes(target));
                    branch.cursor = Cursor::new(chain);
                    return;
                }
            }
        }
        branch.nodes.push(SelectorNode::Element(name.to_string()));
        branch.cursor = None;
    }

    fn scope_pseudo_element(
        &mut self,
        cx: &ScopeContext<'_>,
        name: &str,
        mut branch: Branch,
        out: &mut Vec<Branch>,
    ) {
        let chain = branch
            .cursor
            .as_ref()
            .map(|cursor| cursor.chain.clone())
            .unwrap_or_default();
        for entry in chain.iter().filter(|entry| entry.is_root()) {
            let owner = &entry.meta;
            if let Some(&id) = owner.classes.get(name) {
                if !owner.is_root(id) {
                    let target = self.alias_target(CssResolve::new(Rc::clone(owner), id));
                    branch.nodes.push(SelectorNode::Spacing);
                    branch.nodes.extend(self.class_nodes(&target));
                    branch.cursor = Cursor::new(self.resolver.resolve_chain(target));
                    out.push(branch);
                    return;
                }
            }
            if let Some(selectors) = owner.custom_selectors.get(name) {
                let owner_cx = ScopeContext {
                    meta: owner,
                    nesting: None,
                    root: self.root_cursor(owner),
                    span: cx.span,
                };
                for selector in selectors {
                    let start = owner_cx.root.clone();
                    for inner in self.scope_from(&owner_cx, selector, start) {
                        let mut fanned = branch.clone();
                        fanned.nodes.push(SelectorNode::Spacing);
                        fanned.nodes.extend(inner.nodes);
                        fanned.cursor = inner.cursor;
                        out.push(fanned);
                    }
                }
                return;
            }
        }

        if branch.cursor.is_some() && !is_native_pseudo_element(name) && !is_vendor_prefixed(name)
        {
            let diagnostic = self
                .evaluator
                .locate(
                    &cx.meta.source,
                    DiagnosticCode::UnknownPseudoElement,
                    format!("unknown pseudo-element \"{name}\""),
                    cx.span,
                )
                .with_word(name);
            self.evaluator.report(diagnostic);
        }
        branch
            .nodes
            .push(SelectorNode::PseudoElement(name.to_string()));
        branch.cursor = None;
        out.push(branch);
    }

    fn scope_pseudo_class(
        &mut self,
        cx: &ScopeContext<'_>,
        name: &str,
        content: Option<&str>,
        branch: &mut Branch,
    ) {
        let original = SelectorNode::PseudoClass {
            name: name.to_string(),
            content: content.map(str::to_string),
        };
        let Some(cursor) = branch.cursor.as_ref().filter(|_| !name.starts_with("--")) else {
            branch.nodes.push(original);
            return;
        };

        let found = cursor.chain.iter().find_map(|entry| {
            let states = entry.symbol().as_class()?.states.as_ref()?;
            let def = states.get(name)?;
            Some(state_selector(&entry.meta.namespace, name, def, content))
        });
        match found {
            Some((node, issue)) => {
                branch.nodes.push(node);
                if let Some(issue) = issue {
                    let diagnostic = self
                        .evaluator
                        .locate(&cx.meta.source, issue.code, issue.message, cx.span)
                        .with_word(name);
                    self.evaluator.report(diagnostic);
                }
            }
            None => {
                if !is_native_pseudo_class(name) && !is_vendor_prefixed(name) {
                    let diagnostic = self
                        .evaluator
                        .locate(
                            &cx.meta.source,
                            DiagnosticCode::UnknownStateUsage,
                            format!("unknown pseudo-state \"{name}\""),
                            cx.span,
                        )
                        .with_word(name);
                    self.evaluator.report(diagnostic);
                }
                branch.nodes.push(original);
            }
        }
    }
}
