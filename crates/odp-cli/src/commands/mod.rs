//! Command implementations

mod aggregate;
mod inspect;
mod geodata;

use crate::cli::{Cli, Commands};
use crate::output::OutputWriter;
use crate::runner::RunSummary;
use anyhow::{Context, Result};
use odp_core::config::{parse_crs, CliConfigOverrides, LayeredConfig};
use odp_core::models::ValidityMode;

/// Flags shared by the pipeline commands
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub clean: bool,
}

/// Execute a CLI command. Pipeline commands return their run summary.
pub fn execute(cli: Cli) -> Result<Option<RunSummary>> {
    let output = OutputWriter::new(cli.json, cli.quiet);
    let config = load_config(&cli)?;
    let options = RunOptions { clean: cli.clean };

    match cli.command {
        Commands::Aggregate(args) => {
            aggregate::execute(&args, &config, options, &output).map(Some)
        }
        Commands::Geodata(args) => geodata::execute(&args, &config, options, &output).map(Some),
        Commands::Config => inspect::execute(&config, &output).map(|_| None),
    }
}

/// Build the layered runtime configuration: defaults, file, environment, flags
fn load_config(cli: &Cli) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::with_defaults();

    if let Some(path) = &cli.config {
        config = config
            .load_from_file(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display()))?;
    }

    let mut config = config.load_from_env();

    let target_crs = cli.target_crs.as_deref().map(parse_crs).transpose()?;
    // Quiet runs pass over invalid geometries unless --validity says otherwise
    let geometry_validity =
        cli.validity.map(Into::into).or(cli.quiet.then_some(ValidityMode::Lenient));
    config.update_from_cli(CliConfigOverrides {
        coercion: cli.coercion.map(Into::into),
        geometry_validity,
        target_crs,
        ..Default::default()
    });

    tracing::debug!(
        "Effective configuration: coercion {:?} ({:?}), validity {:?} ({:?}), target {} ({:?})",
        config.coercion.value,
        config.coercion.source,
        config.geometry_validity.value,
        config.geometry_validity.source,
        config.target_crs.value,
        config.target_crs.source
    );

    Ok(config)
}
