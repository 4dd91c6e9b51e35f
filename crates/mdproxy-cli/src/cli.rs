use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The mdproxy developers",
    version,
    about = "mdproxy - drive Lennard-Jones molecular-dynamics runs whose integrators, thermostats and interactions live on a pool of worker ranks.",
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

    /// Set the number of threads used for per-rank energy sums.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation: populate the box, then integrate through the stage schedule.
    Run(RunArgs),
    /// Print the node and cell grids the domain decomposition would use.
    Grid(GridArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a configuration file in TOML format. Built-in defaults are used otherwise.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Session Overrides ---
    /// Number of worker ranks.
    #[arg(short, long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Seed of the system's random-number generator.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Particle Source ---
    #[command(flatten)]
    pub particles: ParticleSourceArgs,

    // --- Integration Overrides ---
    /// Integrator time step.
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub time_step: Option<f64>,

    /// Steps between two samples, applied to every stage.
    #[arg(long, value_name = "INT")]
    pub steps_per_block: Option<u64>,

    /// Run only the stages without a thermostat.
    #[arg(long)]
    pub no_thermostat: bool,

    /// Write the final configuration to an XYZ snapshot.
    #[arg(short = 'o', long, value_name = "PATH")]
    pub xyz_out: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S interaction.cutoff=3.0
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Mutually exclusive ways of choosing the initial particles.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct ParticleSourceArgs {
    /// Place N³ particles on a perturbed cubic lattice.
    #[arg(long, value_name = "N")]
    pub lattice: Option<usize>,
    /// Place COUNT particles at random positions.
    #[arg(long, value_name = "COUNT")]
    pub random: Option<usize>,
    /// Start from the particles stored in an XYZ snapshot.
    #[arg(long, value_name = "PATH")]
    pub restart: Option<PathBuf>,
}

/// Arguments for the `grid` subcommand.
#[derive(Args, Debug)]
pub struct GridArgs {
    /// Box edge length; give one value for a cube or three for x, y and z.
    #[arg(long = "box", value_name = "FLOAT", num_args(1..=3), default_values_t = [10.0])]
    pub box_l: Vec<f64>,

    /// Pair cutoff.
    #[arg(long, value_name = "FLOAT", default_value_t = 2.5)]
    pub cutoff: f64,

    /// Verlet skin added to the cutoff.
    #[arg(long, value_name = "FLOAT", default_value_t = 0.3)]
    pub skin: f64,

    /// Number of worker ranks.
    #[arg(short, long, value_name = "INT", default_value_t = 1)]
    pub workers: usize,
}
