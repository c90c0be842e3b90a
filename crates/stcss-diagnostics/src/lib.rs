//! Diagnostics for the stcss compiler.
//!
//! Every failure the compiler can recover from is reported as a
//! [`Diagnostic`] value instead of an error return. The [`Diagnostics`]
//! collector drops exact duplicates, which keeps re-entrant resolution
//! (the same import or cycle reached from several declarations) from
//! reporting the same problem more than once.
//!
//! # Example
//!
//! ```
//! use stcss_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics};
//! use stcss_parser::Span;
//!
//! let mut diagnostics = Diagnostics::new();
//! let unknown = Diagnostic::new(DiagnosticCode::UnknownVar, "unknown var \"color\"", Span::default());
//! diagnostics.push(unknown.clone());
//! diagnostics.push(unknown);
//! assert_eq!(diagnostics.len(), 1);
//! ```

mod diagnostic;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};

use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use stcss_parser::Span;

type DedupKey = (
    DiagnosticCode,
    String,
    Span,
    Option<Utf8PathBuf>,
    Option<SmolStr>,
);

/// An ordered diagnostic collector that ignores exact repeats.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    seen: FxHashSet<DedupKey>,
}

impl Diagnostics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic unless an identical one was already recorded.
    ///
    /// Returns true if the diagnostic was new.
    pub fn push(&mut self, diagnostic: Diagnostic) -> bool {
        let key = (
            diagnostic.code,
            diagnostic.message.clone(),
            diagnostic.span,
            diagnostic.file.clone(),
            diagnostic.word.clone(),
        );
        if !self.seen.insert(key) {
            return false;
        }
        self.items.push(diagnostic);
        true
    }

    /// Records every diagnostic from an iterator.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Returns the number of recorded diagnostics.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true if any recorded diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Iterates over the recorded diagnostics in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    /// Returns the diagnostics with the given code.
    pub fn with_code(&self, code: DiagnosticCode) -> Vec<&Diagnostic> {
        self.items.iter().filter(|d| d.code == code).collect()
    }

    /// Consumes the collector, returning the diagnostics.
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_severity() {
        let diagnostic = Diagnostic::new(
            DiagnosticCode::UnknownStateUsage,
            "unknown pseudo-state \"x\"",
            Span::default(),
        );
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(!diagnostic.is_error());
        assert!(Diagnostic::new(DiagnosticCode::MissingFrom, "", Span::default()).is_error());
    }

    #[test]
    fn test_duplicates_dropped_in_order() {
        let mut diagnostics = Diagnostics::new();
        let a = Diagnostic::new(DiagnosticCode::UnknownVar, "a", Span::default());
        let b = Diagnostic::new(DiagnosticCode::UnknownVar, "b", Span::default());
        assert!(diagnostics.push(a.clone()));
        assert!(diagnostics.push(b));
        assert!(!diagnostics.push(a));
        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[test]
    fn test_same_message_other_file_kept() {
        let mut diagnostics = Diagnostics::new();
        let base = Diagnostic::new(DiagnosticCode::CyclicValue, "cycle", Span::default());
        diagnostics.push(base.clone().with_file("/a.st.css"));
        diagnostics.push(base.with_file("/b.st.css"));
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_code_strings() {
        assert_eq!(DiagnosticCode::UnknownStateUsage.to_string(), "unknown-state-usage");
        assert_eq!(DiagnosticCode::CyclicValue.as_str(), "cyclic-value");
    }
}
