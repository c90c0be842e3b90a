//! Cross-file symbol resolution.
//!
//! Every hop goes through the [`ModuleHost`], which returns processed
//! (and cached) symbol tables. Alias chains that come back to a symbol
//! already visited stop at the last stylesheet symbol reached instead of
//! looping.

use crate::host::{HostError, ModuleHost};
use crate::js::JsValue;
use crate::meta::{ImportKind, ImportSymbol, StylableMeta, Symbol, SymbolId};
use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

/// A symbol inside a stylesheet.
#[derive(Debug, Clone)]
pub struct CssResolve {
    pub meta: Rc<StylableMeta>,
    pub symbol: SymbolId,
}

impl CssResolve {
    pub fn new(meta: Rc<StylableMeta>, symbol: SymbolId) -> Self {
        Self { meta, symbol }
    }

    /// Returns the resolved symbol.
    pub fn symbol(&self) -> &Symbol {
        self.meta.symbol(self.symbol)
    }

    /// Returns true if both point at the same symbol of the same file.
    pub fn same(&self, other: &CssResolve) -> bool {
        self.symbol == other.symbol && self.meta.source == other.meta.source
    }

    /// Returns true if this is the root class of its file.
    pub fn is_root(&self) -> bool {
        self.meta.is_root(self.symbol)
    }
}

/// An export of a non-stylesheet module.
#[derive(Debug, Clone)]
pub struct JsResolve {
    pub value: JsValue,
    /// The module path.
    pub from: Utf8PathBuf,
    /// The export name, `None` for the default export.
    pub name: Option<SmolStr>,
}

/// The target of an import.
#[derive(Debug, Clone)]
pub enum Resolved {
    Css(CssResolve),
    Js(JsResolve),
}

/// Why an import could not be resolved.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("symbol is not an import")]
    NotImport,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("cannot find export \"{name}\" in \"{from}\"")]
    UnknownExport { name: SmolStr, from: Utf8PathBuf },
}

/// Symbols already passed while following a chain.
#[derive(Debug, Default)]
pub struct VisitedSymbols(FxHashSet<(Utf8PathBuf, SymbolId)>);

impl VisitedSymbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a symbol. Returns false if it was already recorded.
    pub fn visit(&mut self, resolve: &CssResolve) -> bool {
        self.0.insert((resolve.meta.source.clone(), resolve.symbol))
    }
}

/// Follows imports, aliases and `-st-extends` across files.
#[derive(Clone, Copy)]
pub struct StylableResolver<'h> {
    host: &'h dyn ModuleHost,
}

impl<'h> StylableResolver<'h> {
    pub fn new(host: &'h dyn ModuleHost) -> Self {
        Self { host }
    }

    /// Returns the host used to load import targets.
    pub fn host(&self) -> &'h dyn ModuleHost {
        self.host
    }

    /// Resolves one hop of an import symbol.
    pub fn resolve_import(
        &self,
        meta: &StylableMeta,
        import: &ImportSymbol,
    ) -> Result<Resolved, ResolveError> {
        let imported = meta.imported(import).ok_or(ResolveError::NotImport)?;
        if imported.is_css {
            let target = self.host.process(&imported.from)?;
            let symbol = match &import.kind {
                ImportKind::Default => Some(target.root_id()),
                ImportKind::Named { exported } => target.get(exported),
            };
            return match symbol {
                Some(symbol) => Ok(Resolved::Css(CssResolve::new(target, symbol))),
                None => Err(ResolveError::UnknownExport {
                    name: export_name(import),
                    from: imported.from.clone(),
                }),
            };
        }

        let module = self.host.require(&imported.from)?;
        let (value, name) = match &import.kind {
            ImportKind::Default => (module.default_export().clone(), None),
            ImportKind::Named { exported } => match module.get(exported) {
                Some(value) => (value.clone(), Some(exported.clone())),
                None => {
                    return Err(ResolveError::UnknownExport {
                        name: exported.clone(),
                        from: imported.from.clone(),
                    })
                }
            },
        };
        Ok(Resolved::Js(JsResolve {
            value,
            from: imported.from.clone(),
            name,
        }))
    }

    /// Resolves an import symbol one hop. Other symbols resolve to `None`.
    pub fn resolve(&self, meta: &Rc<StylableMeta>, id: SymbolId) -> Option<Resolved> {
        let import = meta.symbol(id).as_import()?;
        self.resolve_import(meta, import).ok()
    }

    /// Follows imports and alias-only classes until a defining symbol.
    pub fn deep_resolve(&self, meta: &Rc<StylableMeta>, id: SymbolId) -> Option<Resolved> {
        let mut visited = VisitedSymbols::new();
        let mut current = CssResolve::new(Rc::clone(meta), id);
        let mut last_good: Option<CssResolve> = None;
        loop {
            if !visited.visit(&current) {
                trace!(source = %current.meta.source, "alias cycle");
                return last_good.map(Resolved::Css);
            }
            let next_import = match current.symbol() {
                Symbol::Import(import) => Some(import.clone()),
                Symbol::Class(class) if class.extends.is_none() => class
                    .alias
                    .and_then(|alias| current.meta.symbol(alias).as_import().cloned()),
                Symbol::Element(element) => element
                    .alias
                    .and_then(|alias| current.meta.symbol(alias).as_import().cloned()),
                _ => None,
            };
            let Some(import) = next_import else {
                return Some(Resolved::Css(current));
            };
            if !matches!(current.symbol(), Symbol::Import(_)) {
                last_good = Some(current.clone());
            }
            match self.resolve_import(&current.meta, &import) {
                Ok(Resolved::Css(next)) => current = next,
                Ok(js) => return Some(js),
                Err(_) => return None,
            }
        }
    }

    /// Resolves the direct `-st-extends` target of a class.
    ///
    /// Returns `None` when the symbol does not extend anything or the target
    /// cannot be loaded.
    pub fn extends_target(&self, from: &CssResolve) -> Option<CssResolve> {
        let class = from.symbol().as_class()?;
        let target = class.extends?;
        self.resolve_local(&from.meta, target)
    }

    fn resolve_local(&self, meta: &Rc<StylableMeta>, id: SymbolId) -> Option<CssResolve> {
        match meta.symbol(id) {
            Symbol::Class(class) if class.alias.is_none() || class.extends.is_some() => {
                Some(CssResolve::new(Rc::clone(meta), id))
            }
            _ => match self.deep_resolve(meta, id)? {
                Resolved::Css(css) => Some(css),
                Resolved::Js(_) => None,
            },
        }
    }

    /// Builds the inheritance chain starting at `start`.
    ///
    /// Each entry is followed by what it extends, or by the target it names
    /// when it is an alias. The walk ends at the first unresolved hop or at
    /// a symbol already in the chain.
    pub fn resolve_chain(&self, start: CssResolve) -> Vec<CssResolve> {
        let mut chain = vec![start];
        loop {
            let Some(current) = chain.last() else {
                break;
            };
            let next = match current.symbol() {
                Symbol::Class(class) if class.extends.is_some() => self.extends_target(current),
                Symbol::Class(class) if class.alias.is_some() => {
                    match self.deep_resolve(&current.meta, current.symbol) {
                        Some(Resolved::Css(css)) if !css.same(current) => Some(css),
                        _ => None,
                    }
                }
                Symbol::Element(_) | Symbol::Import(_) => {
                    match self.deep_resolve(&current.meta, current.symbol) {
                        Some(Resolved::Css(css)) if !css.same(current) => Some(css),
                        _ => None,
                    }
                }
                _ => None,
            };
            match next {
                Some(next) if !chain.iter().any(|c| c.same(&next)) => chain.push(next),
                _ => break,
            }
        }
        chain
    }

    /// Inheritance chain of a local class or element by name.
    pub fn resolve_extends(
        &self,
        meta: &Rc<StylableMeta>,
        name: &str,
        is_element: bool,
    ) -> Vec<CssResolve> {
        let symbols = if is_element {
            &meta.elements
        } else {
            &meta.classes
        };
        match symbols.get(name) {
            Some(id) => self.resolve_chain(CssResolve::new(Rc::clone(meta), *id)),
            None => Vec::new(),
        }
    }
}

fn export_name(import: &ImportSymbol) -> SmolStr {
    match &import.kind {
        ImportKind::Default => SmolStr::new_static("default"),
        ImportKind::Named { exported } => exported.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{FileProcessor, MemoryFileSystem};
    use crate::processor::ProcessOptions;
    use camino::Utf8Path;

    fn processor(files: &[(&str, &str)]) -> FileProcessor<MemoryFileSystem> {
        FileProcessor::new(
            MemoryFileSystem::with_files(files.iter().copied()),
            ProcessOptions::default(),
        )
    }

    fn names(chain: &[CssResolve]) -> Vec<String> {
        chain
            .iter()
            .map(|c| format!("{}:{}", c.meta.source.file_name().unwrap_or(""), c.symbol().name()))
            .collect()
    }

    #[test]
    fn test_named_and_default_imports() {
        let host = processor(&[
            (
                "/entry.st.css",
                r#":import { -st-from: "./button.st.css"; -st-default: Button; -st-named: icon, missing; }"#,
            ),
            ("/button.st.css", ".icon {}"),
        ]);
        let meta = host.process(Utf8Path::new("/entry.st.css")).unwrap();
        let resolver = StylableResolver::new(&host);

        let Some(Resolved::Css(button)) = resolver.resolve(&meta, meta.get("Button").unwrap())
        else {
            panic!("expected stylesheet symbol");
        };
        assert!(button.is_root());
        let Some(Resolved::Css(icon)) = resolver.resolve(&meta, meta.get("icon").unwrap()) else {
            panic!("expected stylesheet symbol");
        };
        assert_eq!(icon.symbol().name(), "icon");
        assert!(resolver.resolve(&meta, meta.get("root").unwrap()).is_none());

        let missing = meta.symbol(meta.get("missing").unwrap()).as_import().unwrap();
        assert!(matches!(
            resolver.resolve_import(&meta, missing),
            Err(ResolveError::UnknownExport { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let host = processor(&[(
            "/entry.st.css",
            r#":import { -st-from: "./nope.st.css"; -st-default: Nope; }"#,
        )]);
        let meta = host.process(Utf8Path::new("/entry.st.css")).unwrap();
        let import = meta.symbol(meta.get("Nope").unwrap()).as_import().unwrap();
        let resolver = StylableResolver::new(&host);
        assert!(matches!(
            resolver.resolve_import(&meta, import),
            Err(ResolveError::Host(HostError::NotFound(_)))
        ));
        assert!(resolver.deep_resolve(&meta, meta.get("Nope").unwrap()).is_none());
    }

    #[test]
    fn test_js_imports() {
        let host = processor(&[(
            "/entry.st.css",
            r#":import { -st-from: "./fmt.js"; -st-default: fmt; -st-named: upper; }"#,
        )]);
        host.register_module(
            "/fmt.js",
            JsValue::object([
                ("default", JsValue::from("def")),
                ("upper", JsValue::function(|args| Ok(args.join("").to_uppercase().into()))),
            ]),
        );
        let meta = host.process(Utf8Path::new("/entry.st.css")).unwrap();
        let resolver = StylableResolver::new(&host);
        let Some(Resolved::Js(default)) = resolver.resolve(&meta, meta.get("fmt").unwrap()) else {
            panic!("expected module export");
        };
        assert_eq!(default.value.as_css_string().as_deref(), Some("def"));
        let Some(Resolved::Js(upper)) = resolver.resolve(&meta, meta.get("upper").unwrap()) else {
            panic!("expected module export");
        };
        assert_eq!(upper.name.as_deref(), Some("upper"));
        assert!(matches!(upper.value, JsValue::Function(_)));
    }

    #[test]
    fn test_chain_follows_extends_across_files() {
        let host = processor(&[
            (
                "/entry.st.css",
                r#":import { -st-from: "./button.st.css"; -st-default: Button; }
                .fancy { -st-extends: Button; }"#,
            ),
            (
                "/button.st.css",
                r#":import { -st-from: "./base.st.css"; -st-default: Base; }
                .root { -st-extends: Base; }"#,
            ),
            ("/base.st.css", ".root {}"),
        ]);
        let meta = host.process(Utf8Path::new("/entry.st.css")).unwrap();
        let resolver = StylableResolver::new(&host);
        let chain = resolver.resolve_extends(&meta, "fancy", false);
        assert_eq!(
            names(&chain),
            vec!["entry.st.css:fancy", "button.st.css:root", "base.st.css:root"]
        );
    }

    #[test]
    fn test_alias_cycle_terminates() {
        let host = processor(&[
            (
                "/a.st.css",
                r#":import { -st-from: "./b.st.css"; -st-named: x; } .x {}"#,
            ),
            (
                "/b.st.css",
                r#":import { -st-from: "./a.st.css"; -st-named: x; } .x {}"#,
            ),
        ]);
        let meta = host.process(Utf8Path::new("/a.st.css")).unwrap();
        let resolver = StylableResolver::new(&host);
        let resolved = resolver.deep_resolve(&meta, meta.get("x").unwrap());
        let Some(Resolved::Css(css)) = resolved else {
            panic!("expected last stylesheet symbol before the cycle");
        };
        assert_eq!(css.symbol().name(), "x");
        let chain = resolver.resolve_extends(&meta, "x", false);
        assert!(chain.len() <= 2);
    }
}
