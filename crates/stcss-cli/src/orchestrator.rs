//! Main orchestration logic.

use crate::cli::{Args, OutputFormat};
use crate::config::{BuildSettings, StcssConfig};
use crate::output::{passes_threshold, BuildSummary, FormattedDiagnostic, Formatter};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use stcss_compiler::{OsFileSystem, ProcessOptions, Stylable, TransformOptions};
use stcss_diagnostics::{Diagnostic, DiagnosticCode, Severity};
use stcss_parser::Span;
use std::fs;
use std::io;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

const STYLESHEET_SUFFIX: &str = ".st.css";

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The workspace path could not be resolved.
    #[error("invalid workspace {path}: {reason}")]
    Workspace { path: Utf8PathBuf, reason: String },

    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(#[from] globset::Error),

    /// An output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },

    /// Watch error.
    #[error("watch error: {0}")]
    WatchFailed(String),
}

/// Runs a build, or keeps rebuilding in watch mode.
pub fn run(args: &Args) -> Result<BuildSummary, BuildError> {
    let workspace = absolute_workspace(&args.workspace)?;
    let config = StcssConfig::load(&workspace);
    let settings = BuildSettings::resolve(args, workspace, config);
    debug!(?settings, "resolved build settings");

    let builder = Builder::new(args, settings)?;
    if args.watch {
        run_watch_mode(args, &builder)
    } else {
        builder.build()
    }
}

fn absolute_workspace(workspace: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    if workspace.is_absolute() {
        return Ok(workspace.to_path_buf());
    }
    let current = std::env::current_dir().map_err(|e| BuildError::Workspace {
        path: workspace.to_path_buf(),
        reason: e.to_string(),
    })?;
    let current = Utf8PathBuf::try_from(current).map_err(|e| BuildError::Workspace {
        path: workspace.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(stcss_compiler::normalize_path(&current.join(workspace)))
}

/// Builds the glob set of paths to skip, relative to the workspace.
fn ignore_set(settings: &BuildSettings) -> Result<GlobSet, BuildError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in &settings.ignore {
        builder.add(Glob::new(pattern)?);
    }
    builder.add(Glob::new("**/node_modules/**")?);
    if let Ok(out_dir) = settings.out_dir.strip_prefix(&settings.workspace) {
        if !out_dir.as_str().is_empty() {
            builder.add(Glob::new(&format!("{out_dir}/**"))?);
        }
    }
    Ok(builder.build()?)
}

/// Finds every stylesheet under the workspace, in path order.
pub fn discover(workspace: &Utf8Path, ignore: &GlobSet) -> Vec<Utf8PathBuf> {
    let mut files: Vec<Utf8PathBuf> = WalkDir::new(workspace)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| p.as_str().ends_with(STYLESHEET_SUFFIX))
        .filter(|p| {
            let relative = p.strip_prefix(workspace).unwrap_or(p);
            !ignore.is_match(relative.as_str())
        })
        .collect();
    files.sort();
    files
}

/// Output paths for a stylesheet: `<out>/<dir>/<name>.css` and `<name>.json`.
pub fn output_paths(settings: &BuildSettings, file: &Utf8Path) -> (Utf8PathBuf, Utf8PathBuf) {
    let relative = file.strip_prefix(&settings.workspace).unwrap_or(file);
    let file_name = relative.file_name().unwrap_or_default();
    let stem = file_name
        .strip_suffix(STYLESHEET_SUFFIX)
        .unwrap_or(file_name);
    let dir = match relative.parent() {
        Some(parent) => settings.out_dir.join(parent),
        None => settings.out_dir.clone(),
    };
    (dir.join(format!("{stem}.css")), dir.join(format!("{stem}.json")))
}

struct Builder {
    settings: BuildSettings,
    ignore: GlobSet,
    stylable: Stylable<OsFileSystem>,
    output: OutputFormat,
    threshold: crate::cli::Threshold,
}

impl Builder {
    fn new(args: &Args, settings: BuildSettings) -> Result<Self, BuildError> {
        let ignore = ignore_set(&settings)?;
        let options = TransformOptions {
            delimiter: settings.delimiter.as_str().into(),
            ..TransformOptions::default()
        };
        Ok(Self {
            ignore,
            stylable: Stylable::new(OsFileSystem, ProcessOptions::default(), options),
            output: args.output,
            threshold: args.threshold,
            settings,
        })
    }

    fn relative<'p>(&self, path: &'p Utf8Path) -> &'p Utf8Path {
        path.strip_prefix(&self.settings.workspace).unwrap_or(path)
    }

    /// Builds every stylesheet and prints the diagnostics.
    fn build(&self) -> Result<BuildSummary, BuildError> {
        let files = discover(&self.settings.workspace, &self.ignore);
        info!(count = files.len(), "building stylesheets");

        let formatter = Formatter::new(self.output);
        let mut summary = BuildSummary {
            file_count: files.len(),
            ..BuildSummary::default()
        };
        let mut json_output: Vec<FormattedDiagnostic> = Vec::new();

        for file in &files {
            let diagnostics = match self.stylable.transform_file(file) {
                Ok(result) => {
                    if self.settings.emit {
                        let (css_path, json_path) = output_paths(&self.settings, file);
                        let exports = serde_json::to_string_pretty(&result.exports)
                            .unwrap_or_else(|_| "{}".to_string());
                        write_output(&css_path, &result.css)?;
                        write_output(&json_path, &exports)?;
                        summary.written_count += 2;
                    }
                    result.diagnostics
                }
                Err(e) => vec![Diagnostic::new(
                    DiagnosticCode::UnknownImport,
                    format!("failed to load stylesheet: {e}"),
                    Span::default(),
                )
                .with_severity(Severity::Error)],
            };

            for (path, group) in group_by_file(file, diagnostics, self.threshold) {
                for diag in &group {
                    match diag.severity {
                        Severity::Error => summary.error_count += 1,
                        Severity::Warning => summary.warning_count += 1,
                        Severity::Info => {}
                    }
                }
                let source = fs::read_to_string(&path).unwrap_or_default();
                let display = self.relative(&path);
                if self.output == OutputFormat::Json {
                    json_output.extend(Formatter::format_json_diagnostics(
                        &group, display, &source,
                    ));
                } else {
                    print!("{}", formatter.format(&group, display, &source));
                }
            }
        }

        match self.output {
            OutputFormat::Json => println!(
                "{}",
                serde_json::to_string_pretty(&json_output).unwrap_or_default()
            ),
            OutputFormat::Human | OutputFormat::HumanVerbose => println!("{}", summary.format()),
            OutputFormat::Machine => {}
        }

        Ok(summary)
    }
}

/// Splits a file's diagnostics by the file they point into, keeping order.
fn group_by_file(
    file: &Utf8Path,
    diagnostics: Vec<Diagnostic>,
    threshold: crate::cli::Threshold,
) -> Vec<(Utf8PathBuf, Vec<Diagnostic>)> {
    let mut groups: Vec<(Utf8PathBuf, Vec<Diagnostic>)> = Vec::new();
    for diag in diagnostics {
        if !passes_threshold(diag.severity, threshold) {
            continue;
        }
        let target = diag.file.clone().unwrap_or_else(|| file.to_path_buf());
        match groups.iter_mut().find(|(path, _)| *path == target) {
            Some((_, group)) => group.push(diag),
            None => groups.push((target, vec![diag])),
        }
    }
    groups
}

fn write_output(path: &Utf8Path, content: &str) -> Result<(), BuildError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    };
    write().map_err(|source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path, "wrote output");
    Ok(())
}

/// Returns whether a changed path can affect the build.
fn is_relevant_change(path: &Utf8Path, settings: &BuildSettings) -> bool {
    if path.starts_with(&settings.out_dir) {
        return false;
    }
    path.as_str().ends_with(STYLESHEET_SUFFIX) || path.extension() == Some("json")
}

/// Runs in watch mode.
fn run_watch_mode(args: &Args, builder: &Builder) -> Result<BuildSummary, BuildError> {
    use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc;
    use std::time::Duration;

    println!("Starting watch mode...\n");

    builder.build()?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| BuildError::WatchFailed(e.to_string()))?;

    watcher
        .watch(
            builder.settings.workspace.as_std_path(),
            RecursiveMode::Recursive,
        )
        .map_err(|e| BuildError::WatchFailed(e.to_string()))?;

    println!("Watching for changes... (Ctrl+C to stop)\n");

    while let Ok(event) = rx.recv() {
        let changed: Vec<Utf8PathBuf> = event
            .paths
            .into_iter()
            .filter_map(|p| Utf8PathBuf::try_from(p).ok())
            .filter(|p| is_relevant_change(p, &builder.settings))
            .collect();
        if changed.is_empty() {
            continue;
        }

        for path in &changed {
            builder.stylable.host().invalidate(path);
        }

        if !args.preserve_watch_output {
            print!("\x1B[2J\x1B[1;1H");
        }
        println!("File changed, rebuilding...\n");

        if let Err(e) = builder.build() {
            eprintln!("Error: {e}");
        }
    }

    Err(BuildError::WatchFailed(
        "watch channel closed unexpectedly".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn settings(args: &[&str]) -> BuildSettings {
        let args = Args::parse_from(args);
        BuildSettings::resolve(&args, Utf8PathBuf::from("/work"), StcssConfig::default())
    }

    #[test]
    fn test_output_paths_mirror_tree() {
        let settings = settings(&["stcss"]);
        let (css, json) = output_paths(&settings, Utf8Path::new("/work/src/button.st.css"));
        assert_eq!(css, Utf8PathBuf::from("/work/dist/src/button.css"));
        assert_eq!(json, Utf8PathBuf::from("/work/dist/src/button.json"));
    }

    #[test]
    fn test_ignore_set_covers_out_dir() {
        let settings = settings(&["stcss", "--ignore", "legacy/**"]);
        let ignore = ignore_set(&settings).expect("valid globs");
        assert!(ignore.is_match("dist/button.st.css"));
        assert!(ignore.is_match("legacy/old.st.css"));
        assert!(ignore.is_match("a/node_modules/lib/x.st.css"));
        assert!(!ignore.is_match("src/button.st.css"));
    }

    #[test]
    fn test_relevant_changes() {
        let settings = settings(&["stcss"]);
        assert!(is_relevant_change(Utf8Path::new("/work/a.st.css"), &settings));
        assert!(is_relevant_change(Utf8Path::new("/work/tokens.json"), &settings));
        assert!(!is_relevant_change(Utf8Path::new("/work/dist/a.json"), &settings));
        assert!(!is_relevant_change(Utf8Path::new("/work/readme.md"), &settings));
    }

    #[test]
    fn test_group_by_file_keeps_order() {
        let local = Diagnostic::new(DiagnosticCode::UnknownVar, "a", Span::default())
            .with_severity(Severity::Warning);
        let imported = Diagnostic::new(DiagnosticCode::UnknownVar, "b", Span::default())
            .with_severity(Severity::Warning)
            .with_file("/work/lib.st.css");
        let info = Diagnostic::new(DiagnosticCode::UnknownVar, "c", Span::default())
            .with_severity(Severity::Info);

        let groups = group_by_file(
            Utf8Path::new("/work/a.st.css"),
            vec![local, imported, info],
            crate::cli::Threshold::Warning,
        );
        let paths: Vec<&str> = groups.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(paths, vec!["/work/a.st.css", "/work/lib.st.css"]);
        assert_eq!(groups[0].1.len(), 1);
    }
}
