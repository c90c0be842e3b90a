//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Builds stcss stylesheets into scoped CSS and export maps.
#[derive(Debug, Parser)]
#[command(name = "stcss")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory searched for `*.st.css` files
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Directory the `.css` and `.json` outputs are written to
    #[arg(long = "out-dir")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Separator between namespace and local name in scoped names
    #[arg(long)]
    pub delimiter: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Minimum severity threshold
    #[arg(long, value_enum, default_value = "warning")]
    pub threshold: Threshold,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Report diagnostics without writing any output files
    #[arg(long = "no-emit")]
    pub no_emit: bool,

    /// Rebuild when stylesheets change
    #[arg(long)]
    pub watch: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long = "preserve-watch-output")]
    pub preserve_watch_output: bool,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Human-readable with code snippets
    HumanVerbose,
    /// JSON output
    Json,
    /// Machine-readable (one line per diagnostic)
    Machine,
}

/// Severity threshold.
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum Threshold {
    /// Only show errors
    Error,
    /// Show errors and warnings (default)
    #[default]
    Warning,
    /// Show everything
    Info,
}
