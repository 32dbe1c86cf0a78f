use clap::{Args, Parser, Subcommand, ValueEnum};
use fepflow::workflows::analyze::Method;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "fepflow - equilibration pipelines and fast-growth free energy estimates for GROMACS absolute free energy studies.",
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
    /// Run the staged equilibration chain for one or more study folders.
    Equil(EquilArgs),
    /// Integrate dgdl.xvg work curves and estimate the free energy difference.
    Analyze(AnalyzeArgs),
}

/// Arguments for the `equil` subcommand. Unset options fall back to the
/// study configuration file, then to the listed defaults.
#[derive(Args, Debug)]
pub struct EquilArgs {
    /// Study folder names, one per protein, relative to the base path.
    #[arg(required = true, value_name = "PROTEIN")]
    pub proteins: Vec<String>,

    /// Path to a study configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root directory holding the per-protein study folders [default: .]
    #[arg(long, value_name = "PATH")]
    pub base_path: Option<PathBuf>,

    /// Directory containing the topology files [default: .]
    #[arg(long = "toppath", value_name = "PATH")]
    pub top_path: Option<PathBuf>,

    /// Directory containing the mdp parameter files [default: ./mdp]
    #[arg(long = "mdppath", value_name = "PATH")]
    pub mdp_path: Option<PathBuf>,

    /// Force-field directory exported as GMXLIB to every simulation
    /// [default: ../../../data/mutff]
    #[arg(long, value_name = "PATH")]
    pub gmxlib: Option<PathBuf>,

    /// Name of the mdrun binary [default: mdrun]
    #[arg(long, value_name = "BINARY")]
    pub mdrun: Option<String>,

    /// Name of the double precision mdrun binary [default: mdrun]
    #[arg(long, value_name = "BINARY")]
    pub mdrun_double: Option<String>,

    /// Extra arguments passed through to mdrun
    /// [default: " -ntmpi 1 -notunepme "]
    #[arg(long, value_name = "OPTS", allow_hyphen_values = true)]
    pub mdrun_opts: Option<String>,

    /// Submit each stage to the SGE batch queue instead of running locally.
    #[arg(long = "rem-sched")]
    pub rem_sched: bool,

    /// SGE parallel environment requested for batch jobs
    /// [default: openmp_fast]
    #[arg(long = "pe", value_name = "NAME")]
    pub parallel_env: Option<String>,

    /// Number of independent repeats per protein [default: 3]
    #[arg(short = 'n', long, value_name = "INT")]
    pub repeats: Option<usize>,

    /// Morph state suffixes, comma separated [default: A,B]
    #[arg(long, value_delimiter = ',', value_name = "STATES")]
    pub states: Option<Vec<String>>,

    /// Run all stages with the double precision binary.
    #[arg(long)]
    pub double: bool,

    /// Restrain post-minimization stages to the minimized structure instead
    /// of the initial solvated one.
    #[arg(long = "restr-to-em")]
    pub restrain_to_em: bool,

    /// Explicit position restraint reference structure for every stage.
    #[arg(long, value_name = "PATH")]
    pub posre_ref: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodArg {
    /// Crooks Gaussian Intersection.
    Cgi,
    /// Bennett Acceptance Ratio.
    Bar,
    /// Jarzynski exponential averages.
    Jarz,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Cgi => Method::Cgi,
            MethodArg::Bar => Method::Bar,
            MethodArg::Jarz => Method::Jarz,
        }
    }
}

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Forward (0->1) dgdl.xvg files.
    #[arg(short = 'f', long = "forward", value_name = "FILES", num_args(1..))]
    pub files_forward: Vec<String>,

    /// Reverse (1->0) dgdl.xvg files.
    #[arg(short = 'r', long = "reverse", value_name = "FILES", num_args(1..))]
    pub files_reverse: Vec<String>,

    /// Estimators to run, comma separated.
    #[arg(
        short = 'm',
        long,
        value_enum,
        value_delimiter = ',',
        default_values_t = vec![MethodArg::Cgi, MethodArg::Bar, MethodArg::Jarz]
    )]
    pub methods: Vec<MethodArg>,

    /// Simulation temperature in Kelvin.
    #[arg(short = 't', long, default_value_t = 298.15, value_name = "K")]
    pub temperature: f64,

    /// Results file; the report is also printed to the console.
    #[arg(short = 'o', long, default_value = "results.txt", value_name = "PATH")]
    pub output: PathBuf,

    /// Bootstrap samples for the error estimates (0 disables).
    #[arg(long, default_value_t = 0, value_name = "INT")]
    pub nboots: usize,

    /// Blocks for the block-averaged error estimates (1 disables).
    #[arg(long, default_value_t = 1, value_name = "INT")]
    pub nblocks: usize,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Decimal places of the reported values.
    #[arg(long, default_value_t = 2, value_name = "INT")]
    pub precision: usize,

    /// Output unit: kJ, kcal, or kT.
    #[arg(short = 'u', long, default_value = "kJ", value_name = "UNIT")]
    pub units: String,

    /// Negate the reverse work values (for studies where both legs ran
    /// lambda 0 -> 1).
    #[arg(long = "reverse-b")]
    pub reverse_b: bool,

    /// Skip the Kolmogorov-Smirnov normality test.
    #[arg(long)]
    pub no_ks: bool,

    /// Integrate the inputs, write the work tables, and stop.
    #[arg(long)]
    pub integ_only: bool,

    /// Previously written forward work table; skips the xvg inputs.
    #[arg(long = "iA", value_name = "PATH", requires = "integ_in_reverse")]
    pub integ_in_forward: Option<PathBuf>,

    /// Previously written reverse work table; skips the xvg inputs.
    #[arg(long = "iB", value_name = "PATH", requires = "integ_in_forward")]
    pub integ_in_reverse: Option<PathBuf>,

    /// Where to write the forward work table.
    #[arg(long = "oA", default_value = "integA.dat", value_name = "PATH")]
    pub integ_out_forward: PathBuf,

    /// Where to write the reverse work table.
    #[arg(long = "oB", default_value = "integB.dat", value_name = "PATH")]
    pub integ_out_reverse: PathBuf,
}

/// Mutually exclusive ways of thinning the sorted input file lists.
#[derive(Args, Debug, Clone, Default)]
#[group(required = false, multiple = false)]
pub struct SelectionArgs {
    /// Use every Nth file, counted from the end of the sorted list.
    #[arg(long, value_name = "N")]
    pub skip: Option<usize>,

    /// Use files FIRST through LAST (exclusive) of the sorted list.
    #[arg(long, num_args = 2, value_names = ["FIRST", "LAST"])]
    pub slice: Option<Vec<usize>>,

    /// Use a random subset of N files.
    #[arg(long, value_name = "N")]
    pub rand: Option<usize>,

    /// Use the files at these zero-based positions of the sorted list.
    #[arg(long, num_args(1..), value_name = "IDX")]
    pub index: Option<Vec<usize>>,
}
