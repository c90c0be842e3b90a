//! The per-file symbol table.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use stcss_diagnostics::Diagnostic;
use stcss_parser::{Declaration, RuleId, Selector, Span, Stylesheet};

/// Handle of a symbol inside its file's arena.
pub type SymbolId = Idx<Symbol>;

/// The name of the implicit root class.
pub const ROOT: &str = "root";

/// A named entity declared by a stylesheet.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// A class selector.
    Class(ClassSymbol),
    /// A component element (capitalised type selector).
    Element(ElementSymbol),
    /// A binding introduced by an import.
    Import(ImportSymbol),
    /// A `:vars` declaration.
    Var(VarSymbol),
}

impl Symbol {
    /// Returns the local name of the symbol.
    pub fn name(&self) -> &SmolStr {
        match self {
            Symbol::Class(s) => &s.name,
            Symbol::Element(s) => &s.name,
            Symbol::Import(s) => &s.name,
            Symbol::Var(s) => &s.name,
        }
    }

    /// Returns the symbol kind as used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Symbol::Class(_) => "class",
            Symbol::Element(_) => "element",
            Symbol::Import(_) => "import",
            Symbol::Var(_) => "var",
        }
    }

    /// Returns the class symbol, if this is one.
    pub fn as_class(&self) -> Option<&ClassSymbol> {
        match self {
            Symbol::Class(class) => Some(class),
            _ => None,
        }
    }

    /// Returns the var symbol, if this is one.
    pub fn as_var(&self) -> Option<&VarSymbol> {
        match self {
            Symbol::Var(var) => Some(var),
            _ => None,
        }
    }

    /// Returns the import symbol, if this is one.
    pub fn as_import(&self) -> Option<&ImportSymbol> {
        match self {
            Symbol::Import(import) => Some(import),
            _ => None,
        }
    }

    /// Returns true for a class or element that only names an import.
    pub fn is_alias_only(&self) -> bool {
        match self {
            Symbol::Class(class) => class.alias.is_some() && class.extends.is_none(),
            Symbol::Element(element) => element.alias.is_some(),
            _ => false,
        }
    }
}

/// A class declared in a stylesheet.
#[derive(Debug, Clone, Default)]
pub struct ClassSymbol {
    pub name: SmolStr,
    /// Symbol named by `-st-extends`, in the same file.
    pub extends: Option<SymbolId>,
    /// Import symbol this class is a local name for.
    pub alias: Option<SymbolId>,
    /// States declared with `-st-states`.
    pub states: Option<StatesMap>,
    /// True for the implicit root class.
    pub root: bool,
    /// Symbols named by `-st-compose`, in the same file.
    pub compose: Vec<SymbolId>,
    /// Replacement selector from `-st-global`.
    pub global: Option<Vec<Selector>>,
    pub span: Span,
}

/// A capitalised element selector standing for a component.
#[derive(Debug, Clone)]
pub struct ElementSymbol {
    pub name: SmolStr,
    pub alias: Option<SymbolId>,
    pub span: Span,
}

/// How an import binding picks its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// The default export (root class for stylesheets).
    Default,
    /// A named export.
    Named {
        /// The name in the target module.
        exported: SmolStr,
    },
}

/// A local binding to another module's export.
#[derive(Debug, Clone)]
pub struct ImportSymbol {
    pub name: SmolStr,
    pub kind: ImportKind,
    /// Index into [`StylableMeta::imports`].
    pub import: usize,
    /// Directory of the importing file.
    pub context: Utf8PathBuf,
}

/// A variable declared in `:vars`.
#[derive(Debug, Clone)]
pub struct VarSymbol {
    pub name: SmolStr,
    /// The raw declaration value.
    pub text: String,
    /// Custom type from a `@type` comment annotation.
    pub value_type: Option<SmolStr>,
    pub span: Span,
}

/// One `:import` block or `@st-import` rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Imported {
    /// The request as written.
    pub request: String,
    /// The resolved module path.
    pub from: Utf8PathBuf,
    /// True if the target is a stylesheet.
    pub is_css: bool,
    /// Local name of the default export.
    pub default_export: Option<SmolStr>,
    /// Local name to exported name.
    pub named: IndexMap<SmolStr, SmolStr>,
    pub span: Span,
    /// Set by `-st-theme: true`.
    pub theme: bool,
    /// Non-import declarations inside the block.
    pub overrides: Vec<Declaration>,
    /// Directory of the importing file.
    pub context: Utf8PathBuf,
}

/// State name to definition, in declaration order.
pub type StatesMap = IndexMap<SmolStr, StateDef>;

/// A pseudo-state definition.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDef {
    /// Present or absent.
    Boolean,
    /// Compiles to a literal selector fragment.
    Mapped(String),
    /// Carries a validated parameter.
    Typed(TypedState),
}

/// Parameter type of a typed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateParamType {
    String,
    Number,
    Enum,
    Tag,
}

impl StateParamType {
    /// Parses a type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "enum" => Some(Self::Enum),
            "tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

/// A typed state definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedState {
    pub param_type: StateParamType,
    /// Enum options.
    pub arguments: Vec<String>,
    /// Validators such as `minLength(2)` or `max(10)`.
    pub validators: Vec<StateValidator>,
    pub default_value: Option<String>,
}

/// A named validator with its argument.
#[derive(Debug, Clone, PartialEq)]
pub struct StateValidator {
    pub name: SmolStr,
    pub argument: String,
}

/// One entry of a `-st-mixin` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct MixinRef {
    pub name: SmolStr,
    /// Raw argument texts.
    pub args: Vec<String>,
    pub span: Span,
}

/// A `@keyframes` name.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframesRef {
    pub name: SmolStr,
    pub span: Span,
}

/// The symbol table of one stylesheet.
///
/// Built once by the processor and shared through the host cache. The
/// transformer clones [`StylableMeta::ast`] and never mutates the meta.
#[derive(Debug, Clone)]
pub struct StylableMeta {
    /// Canonical path of the stylesheet.
    pub source: Utf8PathBuf,
    pub namespace: SmolStr,
    /// The stylesheet with import, vars and definition rules removed.
    pub ast: Stylesheet,
    symbols: Arena<Symbol>,
    root: SymbolId,
    /// Every named symbol, in declaration order.
    pub mapped_symbols: IndexMap<SmolStr, SymbolId>,
    pub classes: IndexMap<SmolStr, SymbolId>,
    pub elements: IndexMap<SmolStr, SymbolId>,
    pub imports: Vec<Imported>,
    pub vars: Vec<SymbolId>,
    pub keyframes: Vec<KeyframesRef>,
    /// Custom selectors by name without the `:--` prefix.
    pub custom_selectors: IndexMap<SmolStr, Vec<Selector>>,
    /// Mixins applied by each rule.
    pub mixins: FxHashMap<RuleId, Vec<MixinRef>>,
    /// Diagnostics reported while building the table.
    pub diagnostics: Vec<Diagnostic>,
}

impl StylableMeta {
    /// Creates an empty table with the implicit root class.
    pub fn new(source: impl Into<Utf8PathBuf>) -> Self {
        let mut symbols = Arena::new();
        let root = symbols.alloc(Symbol::Class(ClassSymbol {
            name: SmolStr::new_static(ROOT),
            root: true,
            ..ClassSymbol::default()
        }));
        let mut mapped_symbols = IndexMap::new();
        mapped_symbols.insert(SmolStr::new_static(ROOT), root);
        let mut classes = IndexMap::new();
        classes.insert(SmolStr::new_static(ROOT), root);
        Self {
            source: source.into(),
            namespace: SmolStr::default(),
            ast: Stylesheet::default(),
            symbols,
            root,
            mapped_symbols,
            classes,
            elements: IndexMap::new(),
            imports: Vec::new(),
            vars: Vec::new(),
            keyframes: Vec::new(),
            custom_selectors: IndexMap::new(),
            mixins: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Returns the root class symbol id.
    pub fn root_id(&self) -> SymbolId {
        self.root
    }

    /// Returns the symbol for an id.
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub(crate) fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub(crate) fn alloc(&mut self, symbol: Symbol) -> SymbolId {
        self.symbols.alloc(symbol)
    }

    /// Looks up a symbol by local name.
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.mapped_symbols.get(name).copied()
    }

    /// Looks up a class by name.
    pub fn class(&self, name: &str) -> Option<&ClassSymbol> {
        self.classes
            .get(name)
            .and_then(|id| self.symbol(*id).as_class())
    }

    /// Returns the import record behind an import symbol.
    pub fn imported(&self, symbol: &ImportSymbol) -> Option<&Imported> {
        self.imports.get(symbol.import)
    }

    /// Returns true if the symbol is this file's root class.
    pub fn is_root(&self, id: SymbolId) -> bool {
        id == self.root
    }

    /// Directory containing the stylesheet.
    pub fn context(&self) -> &Utf8Path {
        self.source.parent().unwrap_or(Utf8Path::new(""))
    }
}
