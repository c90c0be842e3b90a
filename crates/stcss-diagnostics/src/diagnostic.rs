//! Diagnostic types.

use camino::Utf8PathBuf;
use smol_str::SmolStr;
use stcss_parser::Span;

/// A diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
    /// The source location.
    pub span: Span,
    /// The file the span points into, when it is not the file being built.
    pub file: Option<Utf8PathBuf>,
    /// The offending word within the span, if any.
    pub word: Option<SmolStr>,
    /// A resolution path, for cycle diagnostics (`"file: name"` entries).
    pub trace: Vec<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            severity: code.default_severity(),
            code,
            message: message.into(),
            span,
            file: None,
            word: None,
            trace: Vec::new(),
        }
    }

    /// Attaches the offending word.
    pub fn with_word(mut self, word: impl Into<SmolStr>) -> Self {
        self.word = Some(word.into());
        self
    }

    /// Attaches the file the span belongs to.
    pub fn with_file(mut self, file: impl Into<Utf8PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attaches a resolution path.
    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    /// Overrides the severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns true if this is an error.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// The severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational.
    Info,
    /// A warning that doesn't prevent compilation.
    Warning,
    /// An error that should be fixed.
    Error,
}

impl Severity {
    /// Returns the severity as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic codes for all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // === Parse Codes ===
    /// `parse-error`: Syntax error during parsing
    ParseError,

    // === Symbol Table Codes ===
    /// `forbidden-def-in-complex-selector`: `:import`/`:vars` inside a complex selector
    ForbiddenDefInComplexSelector,
    /// `illegal-prop-in-import`
    IllegalPropInImport,
    /// `missing-from`: `:import` without `-st-from`
    MissingFrom,
    /// `invalid-st-import`: malformed `@st-import`
    InvalidStImport,
    /// `redeclare-symbol`
    RedeclareSymbol,
    /// `override-directive`: same directive twice on one rule
    OverrideDirective,
    /// `root-after-spacing`
    RootAfterSpacing,
    /// `state-definition-in-element`
    StateDefinitionInElement,
    /// `state-definition-in-complex`
    StateDefinitionInComplex,
    /// `cannot-extend-in-complex-selector`
    CannotExtendInComplexSelector,
    /// `cannot-resolve-extends`
    CannotResolveExtends,
    /// `invalid-state-definition`
    InvalidStateDefinition,
    /// `invalid-mixin`: unparsable `-st-mixin` value
    InvalidMixin,
    /// `invalid-global`: `-st-global` on a complex selector
    InvalidGlobal,
    /// `unscoped-element`
    UnscopedElement,
    /// `invalid-namespace`
    InvalidNamespace,
    /// `invalid-custom-selector`
    InvalidCustomSelector,

    // === Resolution Codes ===
    /// `unknown-import`: import target could not be loaded
    UnknownImport,
    /// `unknown-imported-symbol`
    UnknownImportedSymbol,
    /// `unknown-var`
    UnknownVar,
    /// `cyclic-value`
    CyclicValue,
    /// `could-not-resolve-value`: bad path into a custom value
    CouldNotResolveValue,
    /// `cannot-use-as-value`: symbol of the wrong kind used in `value()`
    CannotUseAsValue,
    /// `custom-value-error`
    CustomValueError,

    // === Transform Codes ===
    /// `failed-to-execute-formatter`
    FailedToExecuteFormatter,
    /// `invalid-formatter`
    InvalidFormatter,
    /// `unknown-mixin`
    UnknownMixin,
    /// `failed-to-apply-mixin`
    FailedToApplyMixin,
    /// `cyclic-mixin`
    CyclicMixin,
    /// `cannot-mixin-root`
    CannotMixinRoot,
    /// `cannot-compose-root`
    CannotComposeRoot,
    /// `unknown-compose`
    UnknownCompose,
    /// `unknown-state-usage`
    UnknownStateUsage,
    /// `state-validation-failed`
    StateValidationFailed,
    /// `missing-state-param`
    MissingStateParam,
    /// `unknown-pseudo-element`
    UnknownPseudoElement,
    /// `export-name-collision`
    ExportNameCollision,
}

impl DiagnosticCode {
    /// Returns the default severity for this diagnostic code.
    pub fn default_severity(&self) -> Severity {
        match self {
            DiagnosticCode::ParseError
            | DiagnosticCode::ForbiddenDefInComplexSelector
            | DiagnosticCode::MissingFrom
            | DiagnosticCode::InvalidStImport
            | DiagnosticCode::RootAfterSpacing
            | DiagnosticCode::StateDefinitionInElement
            | DiagnosticCode::StateDefinitionInComplex
            | DiagnosticCode::CannotExtendInComplexSelector
            | DiagnosticCode::CannotResolveExtends
            | DiagnosticCode::InvalidNamespace
            | DiagnosticCode::InvalidCustomSelector
            | DiagnosticCode::UnknownVar
            | DiagnosticCode::CyclicValue
            | DiagnosticCode::CouldNotResolveValue
            | DiagnosticCode::CannotUseAsValue
            | DiagnosticCode::CustomValueError
            | DiagnosticCode::FailedToExecuteFormatter
            | DiagnosticCode::FailedToApplyMixin
            | DiagnosticCode::CyclicMixin
            | DiagnosticCode::CannotMixinRoot
            | DiagnosticCode::CannotComposeRoot
            | DiagnosticCode::ExportNameCollision => Severity::Error,

            DiagnosticCode::IllegalPropInImport
            | DiagnosticCode::RedeclareSymbol
            | DiagnosticCode::OverrideDirective
            | DiagnosticCode::InvalidStateDefinition
            | DiagnosticCode::InvalidMixin
            | DiagnosticCode::InvalidGlobal
            | DiagnosticCode::UnscopedElement
            | DiagnosticCode::UnknownImport
            | DiagnosticCode::UnknownImportedSymbol
            | DiagnosticCode::InvalidFormatter
            | DiagnosticCode::UnknownMixin
            | DiagnosticCode::UnknownCompose
            | DiagnosticCode::UnknownStateUsage
            | DiagnosticCode::StateValidationFailed
            | DiagnosticCode::MissingStateParam
            | DiagnosticCode::UnknownPseudoElement => Severity::Warning,
        }
    }

    /// Returns the diagnostic code as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::ParseError => "parse-error",
            DiagnosticCode::ForbiddenDefInComplexSelector => "forbidden-def-in-complex-selector",
            DiagnosticCode::IllegalPropInImport => "illegal-prop-in-import",
            DiagnosticCode::MissingFrom => "missing-from",
            DiagnosticCode::InvalidStImport => "invalid-st-import",
            DiagnosticCode::RedeclareSymbol => "redeclare-symbol",
            DiagnosticCode::OverrideDirective => "override-directive",
            DiagnosticCode::RootAfterSpacing => "root-after-spacing",
            DiagnosticCode::StateDefinitionInElement => "state-definition-in-element",
            DiagnosticCode::StateDefinitionInComplex => "state-definition-in-complex",
            DiagnosticCode::CannotExtendInComplexSelector => "cannot-extend-in-complex-selector",
            DiagnosticCode::CannotResolveExtends => "cannot-resolve-extends",
            DiagnosticCode::InvalidStateDefinition => "invalid-state-definition",
            DiagnosticCode::InvalidMixin => "invalid-mixin",
            DiagnosticCode::InvalidGlobal => "invalid-global",
            DiagnosticCode::UnscopedElement => "unscoped-element",
            DiagnosticCode::InvalidNamespace => "invalid-namespace",
            DiagnosticCode::InvalidCustomSelector => "invalid-custom-selector",
            DiagnosticCode::UnknownImport => "unknown-import",
            DiagnosticCode::UnknownImportedSymbol => "unknown-imported-symbol",
            DiagnosticCode::UnknownVar => "unknown-var",
            DiagnosticCode::CyclicValue => "cyclic-value",
            DiagnosticCode::CouldNotResolveValue => "could-not-resolve-value",
            DiagnosticCode::CannotUseAsValue => "cannot-use-as-value",
            DiagnosticCode::CustomValueError => "custom-value-error",
            DiagnosticCode::FailedToExecuteFormatter => "failed-to-execute-formatter",
            DiagnosticCode::InvalidFormatter => "invalid-formatter",
            DiagnosticCode::UnknownMixin => "unknown-mixin",
            DiagnosticCode::FailedToApplyMixin => "failed-to-apply-mixin",
            DiagnosticCode::CyclicMixin => "cyclic-mixin",
            DiagnosticCode::CannotMixinRoot => "cannot-mixin-root",
            DiagnosticCode::CannotComposeRoot => "cannot-compose-root",
            DiagnosticCode::UnknownCompose => "unknown-compose",
            DiagnosticCode::UnknownStateUsage => "unknown-state-usage",
            DiagnosticCode::StateValidationFailed => "state-validation-failed",
            DiagnosticCode::MissingStateParam => "missing-state-param",
            DiagnosticCode::UnknownPseudoElement => "unknown-pseudo-element",
            DiagnosticCode::ExportNameCollision => "export-name-collision",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
