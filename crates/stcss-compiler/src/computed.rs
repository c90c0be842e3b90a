//! Computed variable values for tooling.

use crate::custom_values::{BoxValue, CustomValueRegistry, Evaluated};
use crate::exports::ExportValue;
use crate::meta::{StylableMeta, Symbol};
use crate::resolver::{Resolved, StylableResolver};
use crate::values::ValueEvaluator;
use indexmap::IndexMap;
use smol_str::SmolStr;
use stcss_diagnostics::Diagnostic;
use stcss_parser::Span;
use std::rc::Rc;

/// The evaluated value of one variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedVar {
    /// The exported shape of the value.
    pub value: ExportValue,
    /// The value as evaluated, boxes included.
    pub input: Evaluated,
    /// Diagnostics reported while evaluating this variable only.
    pub diagnostics: Vec<Diagnostic>,
}

/// One leaf of a flattened variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatVar {
    /// The variable name followed by list indices and map keys.
    pub path: Vec<String>,
    pub value: String,
}

/// Evaluates every local variable and every imported variable binding.
pub fn get_computed(
    resolver: StylableResolver<'_>,
    registry: &CustomValueRegistry,
    meta: &Rc<StylableMeta>,
) -> IndexMap<SmolStr, ComputedVar> {
    let mut computed = IndexMap::new();
    for (name, id) in &meta.mapped_symbols {
        let span = match meta.symbol(*id) {
            Symbol::Var(var) => var.span,
            Symbol::Import(import) => match resolver.deep_resolve(meta, *id) {
                Some(Resolved::Css(css)) if matches!(css.symbol(), Symbol::Var(_)) => meta
                    .imports
                    .get(import.import)
                    .map(|imported| imported.span)
                    .unwrap_or_default(),
                _ => continue,
            },
            _ => continue,
        };
        computed.insert(name.clone(), compute(resolver, registry, meta, name, span));
    }
    computed
}

fn compute(
    resolver: StylableResolver<'_>,
    registry: &CustomValueRegistry,
    meta: &Rc<StylableMeta>,
    name: &str,
    span: Span,
) -> ComputedVar {
    let mut evaluator = ValueEvaluator::new(resolver, registry, meta.source.clone(), None);
    let input = evaluator.evaluate(meta, &format!("value({name})"), span, &[]);
    ComputedVar {
        value: input.to_export(),
        input,
        diagnostics: evaluator.take_diagnostics().into_vec(),
    }
}

/// Lists the leaves of every computed variable, depth first.
pub fn flatten(
    resolver: StylableResolver<'_>,
    registry: &CustomValueRegistry,
    meta: &Rc<StylableMeta>,
) -> Vec<FlatVar> {
    let mut out = Vec::new();
    for (name, var) in get_computed(resolver, registry, meta) {
        let mut path = vec![name.to_string()];
        flatten_into(&var.input, &mut path, &mut out);
    }
    out
}

fn flatten_into(value: &Evaluated, path: &mut Vec<String>, out: &mut Vec<FlatVar>) {
    match value {
        Evaluated::Str(text) => out.push(FlatVar {
            path: path.clone(),
            value: text.clone(),
        }),
        Evaluated::Box(boxed) => match &boxed.value {
            BoxValue::List(items) => {
                for (index, item) in items.iter().enumerate() {
                    path.push(index.to_string());
                    flatten_into(item, path, out);
                    path.pop();
                }
            }
            BoxValue::Map(entries) => {
                for (key, item) in entries {
                    path.push(key.clone());
                    flatten_into(item, path, out);
                    path.pop();
                }
            }
            BoxValue::Scalar(text) => out.push(FlatVar {
                path: path.clone(),
                value: text.clone(),
            }),
        },
    }
}
