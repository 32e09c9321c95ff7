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
    author,
    version,
    about = "tsdock CLI - Generate and prune transition-state candidate geometries by docking reacting molecules along their reactive atoms.",
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

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed the molecules of a job file and write the pruned pose population.
    Embed(EmbedArgs),
    /// Validate a job file and report its pairings and search size without embedding.
    Check(CheckArgs),
}

/// Input files shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct JobInput {
    /// Path to the job file (TOML) listing molecules, conformers and reactive atoms.
    #[arg(short = 'i', long, required = true, value_name = "PATH")]
    pub job: PathBuf,

    /// Path to an optional configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Search and pruning overrides; each takes precedence over the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct SearchOverrides {
    // --- Search ---
    /// Number of rotation steps about each docking axis.
    #[arg(long, value_name = "INT")]
    pub steps: Option<usize>,

    /// Restrict rotations to [-DEG, +DEG) instead of the full turn.
    #[arg(long = "rotation-range", value_name = "DEG")]
    pub rotation_range: Option<f64>,

    /// Denser search preset (more steps, tighter RMSD, looser clash criteria).
    #[arg(long)]
    pub deep: bool,

    /// Scale forming distances during embedding (the library default when given without a value).
    #[arg(long, value_name = "FACTOR", num_args = 0..=1)]
    pub shrink: Option<Option<f64>>,

    /// Never stretch forming distances to close a ring.
    #[arg(long)]
    pub rigid: bool,

    // --- Pruning ---
    /// RMSD threshold for duplicate removal, in Angstrom.
    #[arg(long, value_name = "FLOAT")]
    pub rmsd: Option<f64>,

    /// Maximum number of clashing atom pairs tolerated per pose.
    #[arg(long = "max-clashes", value_name = "INT")]
    pub max_clashes: Option<usize>,

    /// Distance below which two non-bonded atoms clash, in Angstrom.
    #[arg(long = "clash-distance", value_name = "FLOAT")]
    pub clash_distance: Option<f64>,

    /// Maximum number of unexpected bonds after refinement.
    #[arg(long = "new-bonds", value_name = "INT")]
    pub new_bonds: Option<usize>,

    /// Keep only ring arrangements where both bonds of a molecule form on one face.
    #[arg(long)]
    pub suprafacial: bool,

    /// Deduplicate each pairing separately before a final merge.
    #[arg(long)]
    pub partition: bool,

    /// Skip every filter and emit all raw poses.
    #[arg(long)]
    pub bypass: bool,

    /// Engage the safety override: allow empty results and oversized searches.
    #[arg(long = "let")]
    pub safety_override: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S pruning.rmsd=0.3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `embed` subcommand.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    #[command(flatten)]
    pub input: JobInput,

    /// Path for the pose report (TOML).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Also write per-pose metrics as CSV.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: SearchOverrides,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: JobInput,

    #[command(flatten)]
    pub overrides: SearchOverrides,
}
