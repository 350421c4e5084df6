use clap::{Args, Parser, Subcommand, ValueEnum};
use cgmap::core::fitting::harmonic::FitTarget;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "cgmap - coarse-grained mapping and Boltzmann-inverted harmonic parameterization of molecular dynamics trajectories.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel fitting.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit harmonic bond and angle parameters to sampled distributions.
    Fit(FitArgs),
    /// Inspect or convert bead mapping files.
    Mapping(MappingArgs),
}

/// Arguments for the `fit` subcommand.
#[derive(Args, Debug)]
pub struct FitArgs {
    /// CSV file with an `interaction,value` header. `A-B` rows are bond
    /// lengths, `A-B-C` rows are angles in radians with `B` at the vertex.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub samples: PathBuf,

    /// Output file for the fitted parameters (.toml or .csv).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the temperature in K.
    #[arg(short = 'T', long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Override the Boltzmann constant (energy unit per K).
    #[arg(long, value_name = "FLOAT")]
    pub k_b: Option<f64>,

    /// Override the number of histogram bins.
    #[arg(short, long, value_name = "INT")]
    pub bins: Option<usize>,

    /// Override which curve the harmonic model is fitted against.
    #[arg(long, value_enum, value_name = "TARGET")]
    pub target: Option<TargetArg>,

    /// Write distribution and energy tables for every interaction into this directory.
    #[arg(long, value_name = "DIR")]
    pub diagnostics_dir: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetArg {
    /// Gaussian fitted to the probability density.
    Density,
    /// Harmonic well fitted to the inverted energy.
    Energy,
}

impl From<TargetArg> for FitTarget {
    fn from(target: TargetArg) -> Self {
        match target {
            TargetArg::Density => FitTarget::Density,
            TargetArg::Energy => FitTarget::Energy,
        }
    }
}

/// Arguments for the `mapping` subcommand.
#[derive(Args, Debug)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub command: MappingCommands,
}

#[derive(Subcommand, Debug)]
pub enum MappingCommands {
    /// Print the beads and bonds of a mapping file (.map, .xml or .toml).
    Show {
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Convert a mapping file to TOML.
    Convert {
        #[arg(required = true)]
        input: PathBuf,
        #[arg(required = true)]
        output: PathBuf,
    },
}
