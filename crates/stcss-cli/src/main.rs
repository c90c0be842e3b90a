//! stcss: builds `*.st.css` stylesheets into scoped CSS and export maps.

mod cli;
mod config;
mod orchestrator;
mod output;

use clap::Parser;
use cli::Args;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("STCSS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let summary = orchestrator::run(&args).into_diagnostic()?;
    if summary.failed(args.fail_on_warnings) {
        std::process::exit(1);
    }
    Ok(())
}
