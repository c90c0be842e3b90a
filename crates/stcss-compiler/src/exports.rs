//! The export map: local names to scoped names and resolved values.

use crate::meta::{StylableMeta, Symbol, SymbolId, ROOT};
use crate::resolver::{CssResolve, Resolved};
use crate::transform::Transformation;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use stcss_diagnostics::DiagnosticCode;
use stcss_parser::{SelectorNode, Span};
use std::rc::Rc;

/// An exported value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExportValue {
    String(String),
    List(Vec<ExportValue>),
    Map(IndexMap<String, ExportValue>),
}

impl ExportValue {
    /// Returns the string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ExportValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for ExportValue {
    fn from(value: &str) -> Self {
        ExportValue::String(value.to_string())
    }
}

impl From<String> for ExportValue {
    fn from(value: String) -> Self {
        ExportValue::String(value)
    }
}

/// Exports of one stylesheet, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Exports(IndexMap<String, ExportValue>);

impl Exports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ExportValue> {
        self.0.get(key)
    }

    /// Returns a string export.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ExportValue::as_str)
    }

    /// Adds an export, returning the previous value of the key.
    pub fn insert(&mut self, key: impl Into<String>, value: ExportValue) -> Option<ExportValue> {
        self.0.insert(key.into(), value)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ExportValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Removes CSS escapes: `color\.1` becomes `color.1`, `\31 a` becomes `1a`.
pub fn unescape_css(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let mut hex = String::new();
        while hex.len() < 6 {
            match chars.peek() {
                Some(h) if h.is_ascii_hexdigit() => {
                    hex.push(*h);
                    chars.next();
                }
                _ => break,
            }
        }
        if hex.is_empty() {
            if let Some(next) = chars.next() {
                out.push(next);
            }
            continue;
        }
        if chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        let decoded = u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        out.push(decoded);
    }
    out
}

impl Transformation<'_> {
    /// Builds the export map of the stylesheet being transformed.
    pub(crate) fn build_exports(&mut self) -> Exports {
        let origin = Rc::clone(&self.origin);
        let mut exports = Exports::new();

        for (name, id) in &origin.classes {
            let span = origin
                .symbol(*id)
                .as_class()
                .map(|c| c.span)
                .unwrap_or_default();
            let value = if origin.is_root(*id) {
                let mut visited = FxHashSet::default();
                self.root_export(&origin, &mut visited)
            } else {
                self.class_export(&origin, *id)
            };
            self.add_export(&mut exports, name, ExportValue::String(value), span);
        }

        for id in &origin.vars {
            let Some(var) = origin.symbol(*id).as_var() else {
                continue;
            };
            let value = self.evaluator.evaluate_var(&origin, *id, &[]).to_export();
            self.add_export(&mut exports, &var.name, value, var.span);
        }

        for keyframes in &origin.keyframes {
            let value = self.scoped_name(&origin, &keyframes.name);
            self.add_export(
                &mut exports,
                &keyframes.name,
                ExportValue::String(value),
                keyframes.span,
            );
        }
        exports
    }

    fn add_export(&mut self, exports: &mut Exports, name: &str, value: ExportValue, span: Span) {
        let key = unescape_css(name);
        match exports.get(&key) {
            Some(existing) if *existing != value => {
                let diagnostic = self
                    .evaluator
                    .locate(
                        &self.origin.source,
                        DiagnosticCode::ExportNameCollision,
                        format!("export \"{key}\" is declared more than once with different values"),
                        span,
                    )
                    .with_word(name);
                self.evaluator.report(diagnostic);
            }
            Some(_) => {}
            None => {
                exports.insert(key, value);
            }
        }
    }

    /// The root export: the scoped root plus the roots of theme imports.
    fn root_export(
        &mut self,
        meta: &Rc<StylableMeta>,
        visited: &mut FxHashSet<Utf8PathBuf>,
    ) -> String {
        visited.insert(meta.source.clone());
        let mut names = vec![self.scoped_name(meta, ROOT)];
        for imported in meta.imports.iter().filter(|i| i.theme && i.is_css) {
            if visited.contains(&imported.from) {
                continue;
            }
            if let Ok(theme) = self.resolver.host().process(&imported.from) {
                names.push(self.root_export(&theme, visited));
            }
        }
        names.join(" ")
    }

    fn class_export(&mut self, meta: &Rc<StylableMeta>, id: SymbolId) -> String {
        let Some(class) = meta.symbol(id).as_class() else {
            return String::new();
        };
        if let Some(global) = &class.global {
            return global_class_names(global);
        }
        if meta.symbol(id).is_alias_only() {
            return match self.resolver.deep_resolve(meta, id) {
                Some(Resolved::Css(target)) => self.resolved_class_name(&target),
                _ => self.scoped_name(meta, &class.name),
            };
        }

        let mut names = vec![self.scoped_name(meta, &class.name)];
        let chain = self
            .resolver
            .resolve_chain(CssResolve::new(Rc::clone(meta), id));
        for entry in chain.iter().skip(1) {
            if !entry.is_root() && matches!(entry.symbol(), Symbol::Class(_)) {
                names.push(self.resolved_class_name(entry));
            }
        }

        for target in class.compose.clone() {
            let resolved = match meta.symbol(target) {
                Symbol::Class(c) if c.alias.is_none() => {
                    Some(CssResolve::new(Rc::clone(meta), target))
                }
                _ => match self.resolver.deep_resolve(meta, target) {
                    Some(Resolved::Css(css)) => Some(css),
                    _ => None,
                },
            };
            let Some(resolved) = resolved else {
                continue;
            };
            if resolved.is_root() {
                let diagnostic = self
                    .evaluator
                    .locate(
                        &meta.source,
                        DiagnosticCode::CannotComposeRoot,
                        format!(
                            "cannot compose root class of \"{}\" into \"{}\"",
                            resolved.meta.source, class.name
                        ),
                        class.span,
                    )
                    .with_word(class.name.as_str());
                self.evaluator.report(diagnostic);
                continue;
            }
            let name = self.resolved_class_name(&resolved);
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.join(" ")
    }

    pub(crate) fn resolved_class_name(&self, target: &CssResolve) -> String {
        match target.symbol().as_class().and_then(|c| c.global.as_ref()) {
            Some(global) => global_class_names(global),
            None => self.scoped_name(&target.meta, target.symbol().name()),
        }
    }
}

pub(crate) fn global_class_names(global: &[stcss_parser::Selector]) -> String {
    let mut names = Vec::new();
    for selector in global {
        for node in &selector.nodes {
            if let SelectorNode::Class(name) = node {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
    }
    names.join(" ")
}
