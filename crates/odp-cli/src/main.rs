//! ODP CLI - Transformation runner
//!
//! Reads a transformation file and runs the tabular or geodata pipeline over
//! every declared output.

mod cli;
mod commands;
mod io;
mod output;
mod progress;
mod runner;

use anyhow::Result;
use clap::Parser;
use cli::Cli;

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let summary = commands::execute(cli)?;
    if summary.is_some_and(|s| !s.all_succeeded()) {
        std::process::exit(1);
    }

    Ok(())
}
