//! Output formatting.

use crate::cli::{OutputFormat, Threshold};
use camino::Utf8Path;
use serde::Serialize;
use stcss_diagnostics::{Diagnostic, Severity};
use stcss_parser::LineIndex;

/// A formatted diagnostic for output.
#[derive(Debug, Serialize)]
pub struct FormattedDiagnostic {
    /// The diagnostic type (Error, Warning, Info).
    #[serde(rename = "type")]
    pub diagnostic_type: String,
    /// The file path.
    pub filename: String,
    pub start: Position,
    pub end: Position,
    pub message: String,
    /// The diagnostic code.
    pub code: String,
    /// The symbol the diagnostic is about, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word: Option<String>,
    /// Import or cycle path leading to the problem.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

/// A position in the source.
#[derive(Debug, Serialize)]
pub struct Position {
    /// 1-indexed line number.
    pub line: u32,
    /// 1-indexed column number.
    pub column: u32,
    /// Byte offset.
    pub offset: u32,
}

/// Returns whether a diagnostic passes the severity threshold.
pub fn passes_threshold(severity: Severity, threshold: Threshold) -> bool {
    match threshold {
        Threshold::Error => severity == Severity::Error,
        Threshold::Warning => severity >= Severity::Warning,
        Threshold::Info => true,
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "Error",
        Severity::Warning => "Warning",
        Severity::Info => "Info",
    }
}

/// Formats diagnostics for output.
pub struct Formatter {
    format: OutputFormat,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the diagnostics of one file.
    pub fn format(&self, diagnostics: &[Diagnostic], file_path: &Utf8Path, source: &str) -> String {
        match self.format {
            OutputFormat::Human => self.format_human(diagnostics, file_path, source, false),
            OutputFormat::HumanVerbose => self.format_human(diagnostics, file_path, source, true),
            OutputFormat::Json => {
                let formatted = Self::format_json_diagnostics(diagnostics, file_path, source);
                serde_json::to_string_pretty(&formatted).unwrap_or_default()
            }
            OutputFormat::Machine => self.format_machine(diagnostics, file_path, source),
        }
    }

    fn format_human(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
        snippets: bool,
    ) -> String {
        let line_index = LineIndex::new(source);
        let lines: Vec<&str> = source.lines().collect();
        let mut output = String::new();

        for diag in diagnostics {
            let start = line_index.line_col(diag.span.start);
            output.push_str(&format!(
                "{}:{}:{}\n{}: {} ({})\n",
                file_path,
                start.line + 1,
                start.col + 1,
                severity_label(diag.severity),
                diag.message,
                diag.code
            ));
            for step in &diag.trace {
                output.push_str(&format!("  --> {step}\n"));
            }

            if snippets {
                let line_num = start.line as usize;
                if let Some(line) = lines.get(line_num) {
                    let gutter = (line_num + 1).to_string();
                    output.push_str(&format!("  {gutter} | {line}\n"));
                    output.push_str(&format!(
                        "  {} | {}^\n",
                        " ".repeat(gutter.len()),
                        " ".repeat(start.col as usize)
                    ));
                }
            }

            output.push('\n');
        }

        output
    }

    /// Formats diagnostics into JSON-ready structs.
    pub fn format_json_diagnostics(
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> Vec<FormattedDiagnostic> {
        let line_index = LineIndex::new(source);
        diagnostics
            .iter()
            .map(|diag| {
                let start = line_index.line_col(diag.span.start);
                let end = line_index.line_col(diag.span.end);
                FormattedDiagnostic {
                    diagnostic_type: severity_label(diag.severity).to_string(),
                    filename: file_path.to_string(),
                    start: Position {
                        line: start.line + 1,
                        column: start.col + 1,
                        offset: u32::from(diag.span.start),
                    },
                    end: Position {
                        line: end.line + 1,
                        column: end.col + 1,
                        offset: u32::from(diag.span.end),
                    },
                    message: diag.message.clone(),
                    code: diag.code.to_string(),
                    word: diag.word.as_ref().map(|w| w.to_string()),
                    trace: diag.trace.clone(),
                }
            })
            .collect()
    }

    fn format_machine(
        &self,
        diagnostics: &[Diagnostic],
        file_path: &Utf8Path,
        source: &str,
    ) -> String {
        let line_index = LineIndex::new(source);
        let mut output = String::new();

        for diag in diagnostics {
            let start = line_index.line_col(diag.span.start);
            let end = line_index.line_col(diag.span.end);
            output.push_str(&format!(
                "{} {}:{}:{}:{}:{} {} ({})\n",
                diag.severity.as_str().to_uppercase(),
                file_path,
                start.line + 1,
                start.col + 1,
                end.line + 1,
                end.col + 1,
                diag.message,
                diag.code
            ));
        }

        output
    }
}

/// Summary of a build run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Number of stylesheets built.
    pub file_count: usize,
    /// Number of files written.
    pub written_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
}

impl BuildSummary {
    /// Returns whether the run should exit with a failure status.
    pub fn failed(&self, fail_on_warnings: bool) -> bool {
        self.error_count > 0 || (fail_on_warnings && self.warning_count > 0)
    }

    /// Formats the summary line.
    pub fn format(&self) -> String {
        format!(
            "====================================\nstcss found {} and {} in {}",
            plural(self.error_count, "error"),
            plural(self.warning_count, "warning"),
            plural(self.file_count, "file"),
        )
    }
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}
