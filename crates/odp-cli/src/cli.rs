use clap::{Args, Parser, Subcommand, ValueEnum};
use odp_core::models::{CoercionPolicy, ValidityMode};
use std::path::PathBuf;

/// ODP - Open data product transformation runner
#[derive(Parser, Debug)]
#[command(name = "odp")]
#[command(
    about = "Transform raw tabular and geospatial files into data products",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Regenerate outputs that already exist
    #[arg(long, global = true)]
    pub clean: bool,

    /// Only report failures and the final summary. Geometries nested too
    /// deep are then passed through unless --validity is given.
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Runtime configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How values that do not match their declared type are handled
    #[arg(long, global = true)]
    pub coercion: Option<CoercionArg>,

    /// How geometries nested deeper than a multi-polygon are handled
    #[arg(long, global = true)]
    pub validity: Option<ValidityArg>,

    /// CRS geodata outputs are reprojected to (e.g. EPSG:4326)
    #[arg(long, global = true, value_name = "CRS")]
    pub target_crs: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CoercionArg {
    /// Fail the file on the first value that does not coerce
    Strict,
    /// Keep values that do not coerce
    Lenient,
}

impl From<CoercionArg> for CoercionPolicy {
    fn from(arg: CoercionArg) -> Self {
        match arg {
            CoercionArg::Strict => CoercionPolicy::Strict,
            CoercionArg::Lenient => CoercionPolicy::Lenient,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValidityArg {
    /// Fail the file on invalid geometries
    Strict,
    /// Log invalid geometries and pass them through
    Lenient,
}

impl From<ValidityArg> for ValidityMode {
    fn from(arg: ValidityArg) -> Self {
        match arg {
            ValidityArg::Strict => ValidityMode::Strict,
            ValidityArg::Lenient => ValidityMode::Lenient,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transform CSV sources into aggregated CSV outputs
    Aggregate(RunArgs),

    /// Repair, reproject and annotate GeoJSON sources
    Geodata(RunArgs),

    /// Show the effective runtime configuration and where each value comes from
    Config,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Transformation file (TOML)
    #[arg(long, short = 't', value_name = "FILE")]
    pub transformation: PathBuf,

    /// Directory holding one subdirectory of source files per input port
    #[arg(long, short = 's', value_name = "DIR")]
    pub source: PathBuf,

    /// Directory outputs are written to, one subdirectory per input port
    #[arg(long, short = 'r', value_name = "DIR")]
    pub results: PathBuf,

    /// Directory with reference GeoJSON files and the feature cache
    #[arg(long, value_name = "DIR")]
    pub reference: Option<PathBuf>,
}
